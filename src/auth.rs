// src/auth.rs
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const TOKEN_LENGTH: usize = 48;
pub const SALT_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Trainee,
    Supervisor,
}

/// Identity attached to a request after its bearer token checks out.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    role: Role,
    expires_at: DateTime<Utc>,
}

/// Opaque bearer-token sessions held in memory. Tokens are random
/// alphanumeric strings with no embedded claims; everything they mean lives
/// in the session map, so revocation is just removal.
#[derive(Clone)]
pub struct AuthService {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    ttl: Duration,
}

impl AuthService {
    pub fn new(ttl_hours: u64) -> Self {
        AuthService {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::hours(ttl_hours as i64),
        }
    }

    pub fn issue_token(&self, user_id: &str, role: Role) -> (String, DateTime<Utc>) {
        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let expires_at = Utc::now() + self.ttl;
        self.sessions.lock().unwrap().insert(
            token.clone(),
            Session {
                user_id: user_id.to_string(),
                role,
                expires_at,
            },
        );
        debug!("Issued session for {} expiring {}", user_id, expires_at);
        (token, expires_at)
    }

    /// Resolves a token to its identity. Expired sessions are dropped on
    /// sight rather than waiting for the sweeper.
    pub fn verify(&self, token: &str) -> Option<AuthContext> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Some(AuthContext {
                user_id: session.user_id.clone(),
                role: session.role,
            }),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.lock().unwrap().remove(token).is_some()
    }

    /// Drops every expired session, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Swept {} expired sessions", removed);
        }
        removed
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

// --- Password Hashing ---

pub fn generate_salt() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Random identifier for new accounts, e.g. `usr-k3Jx9QmPa2Lw`.
pub fn generate_id(prefix: &str) -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{}-{}", prefix, suffix)
}

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}
