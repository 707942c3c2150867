// src/store.rs
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::Role;
use crate::logs::DailyLogEntry;
use crate::schedule::ScheduleConfig;

pub type UserId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("email '{email}' is already registered")]
    EmailAlreadyRegistered { email: String },
}

/// Snapshot document written to disk. Logs are flattened to rows because
/// JSON object keys cannot carry the `(user, date)` pair directly.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    users: Vec<UserAccount>,
    schedules: HashMap<UserId, ScheduleConfig>,
    logs: Vec<LogRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LogRow {
    user_id: UserId,
    entry: DailyLogEntry,
}

/// All service state: accounts, per-trainee schedules and per-day logs.
/// Everything lives behind mutexes in memory; mutations are mirrored to a
/// JSON snapshot file when one is configured, so a restart picks up where
/// the service left off.
#[derive(Clone)]
pub struct TrackerStore {
    users: Arc<Mutex<HashMap<UserId, UserAccount>>>,
    schedules: Arc<Mutex<HashMap<UserId, ScheduleConfig>>>,
    logs: Arc<Mutex<HashMap<(UserId, NaiveDate), DailyLogEntry>>>,
    snapshot_path: Option<PathBuf>,
}

impl TrackerStore {
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        TrackerStore {
            users: Arc::new(Mutex::new(HashMap::new())),
            schedules: Arc::new(Mutex::new(HashMap::new())),
            logs: Arc::new(Mutex::new(HashMap::new())),
            snapshot_path,
        }
    }

    /// Restores state from the snapshot file, if one is configured and
    /// exists. A missing file is a normal first start. A schedule that no
    /// longer passes validation (a hand-edited file) is replaced with the
    /// defaults anchored at its start date; resident schedules always pass
    /// validation.
    pub fn load_from_disk(&self) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if !path.exists() {
            info!("No snapshot at {:?}, starting empty", path);
            return Ok(());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading store snapshot {:?}", path))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Parsing store snapshot {:?}", path))?;

        let mut users = self.users.lock().unwrap();
        let mut schedules = self.schedules.lock().unwrap();
        let mut logs = self.logs.lock().unwrap();
        users.clear();
        for account in snapshot.users {
            users.insert(account.id.clone(), account);
        }
        schedules.clear();
        for (user_id, config) in snapshot.schedules {
            let config = match config.validate() {
                Ok(()) => config,
                Err(e) => {
                    warn!(
                        "Snapshot schedule for {} is invalid ({}), restoring defaults from {}",
                        user_id, e, config.start_date
                    );
                    ScheduleConfig::defaults_starting(config.start_date)
                }
            };
            schedules.insert(user_id, config);
        }
        logs.clear();
        for row in snapshot.logs {
            logs.insert((row.user_id, row.entry.date), row.entry);
        }
        info!(
            "Restored snapshot from {:?}: {} users, {} schedules, {} log entries",
            path,
            users.len(),
            schedules.len(),
            logs.len()
        );
        Ok(())
    }

    /// Writes the current state to the snapshot file. Failure is logged and
    /// swallowed so a full disk degrades durability, not availability.
    fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let snapshot = {
            let users = self.users.lock().unwrap();
            let schedules = self.schedules.lock().unwrap();
            let logs = self.logs.lock().unwrap();
            StoreSnapshot {
                users: users.values().cloned().collect(),
                schedules: schedules.clone(),
                logs: logs
                    .iter()
                    .map(|((user_id, _), entry)| LogRow {
                        user_id: user_id.clone(),
                        entry: entry.clone(),
                    })
                    .collect(),
            }
        };
        let serialized = match serde_json::to_string_pretty(&snapshot) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize store snapshot: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(path, serialized) {
            warn!("Failed to write store snapshot to {:?}: {}", path, e);
        } else {
            debug!("Persisted store snapshot to {:?}", path);
        }
    }

    // --- Users ---

    pub fn insert_user(&self, account: UserAccount) -> Result<(), StoreError> {
        {
            let mut users = self.users.lock().unwrap();
            let taken = users
                .values()
                .any(|u| u.email.eq_ignore_ascii_case(&account.email));
            if taken {
                return Err(StoreError::EmailAlreadyRegistered {
                    email: account.email,
                });
            }
            users.insert(account.id.clone(), account);
        }
        self.persist();
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Option<UserAccount> {
        self.users.lock().unwrap().get(user_id).cloned()
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<UserAccount> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// All accounts with the given role, sorted by name for stable listings.
    pub fn list_users_with_role(&self, role: Role) -> Vec<UserAccount> {
        let mut accounts: Vec<UserAccount> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        accounts
    }

    // --- Schedules ---

    /// Returns the trainee's schedule, creating the default one (starting
    /// `today`) on first touch.
    pub fn get_or_create_schedule(&self, user_id: &str, today: NaiveDate) -> ScheduleConfig {
        let (config, created) = {
            let mut schedules = self.schedules.lock().unwrap();
            match schedules.get(user_id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let config = ScheduleConfig::defaults_starting(today);
                    schedules.insert(user_id.to_string(), config.clone());
                    (config, true)
                }
            }
        };
        if created {
            info!("Created default schedule for {} starting {}", user_id, today);
            self.persist();
        }
        config
    }

    /// Replaces the schedule wholesale. Callers validate first.
    pub fn put_schedule(&self, user_id: &str, config: ScheduleConfig) {
        self.schedules
            .lock()
            .unwrap()
            .insert(user_id.to_string(), config);
        self.persist();
    }

    // --- Daily Logs ---

    pub fn get_log(&self, user_id: &str, date: NaiveDate) -> Option<DailyLogEntry> {
        self.logs
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), date))
            .cloned()
    }

    /// Inserts or replaces the entry for `(user, entry.date)`. The map key
    /// guarantees at most one entry per trainee-day.
    pub fn upsert_log(&self, user_id: &str, entry: DailyLogEntry) -> DailyLogEntry {
        self.logs
            .lock()
            .unwrap()
            .insert((user_id.to_string(), entry.date), entry.clone());
        self.persist();
        entry
    }

    pub fn delete_log(&self, user_id: &str, date: NaiveDate) -> Option<DailyLogEntry> {
        let removed = self
            .logs
            .lock()
            .unwrap()
            .remove(&(user_id.to_string(), date));
        if removed.is_some() {
            self.persist();
        }
        removed
    }

    /// The trainee's log history, ascending by date, optionally bounded on
    /// either end (inclusive).
    pub fn logs_in_range(
        &self,
        user_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<DailyLogEntry> {
        let mut entries: Vec<DailyLogEntry> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|((uid, date), _)| {
                uid == user_id
                    && from.map_or(true, |f| *date >= f)
                    && to.map_or(true, |t| *date <= t)
            })
            .map(|(_, entry)| entry.clone())
            .collect();
        entries.sort_by_key(|e| e.date);
        entries
    }
}
