// src/main.rs
use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use axum_server::tls_rustls::RustlsConfig;

mod auth;
mod config;
mod dates;
mod holidays;
mod logs;
mod overlay;
mod progress;
mod reports;
mod schedule;
mod server;
mod store;
mod workdays;

#[cfg(test)]
mod server_tests;

use auth::{AuthService, Role};
use config::{AppConfig, CliArgs};
use holidays::{builtin_calendar, HolidayCalendar};
use server::{create_router, AppState};
use store::{TrackerStore, UserAccount};

/// Hourly prune of expired sessions so a long-running service does not
/// accumulate dead tokens.
const SESSION_SWEEP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("Loading configuration from environment")?;
    config.apply_cli(&CliArgs::parse());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stint-core ({})", config.environment);

    let calendar = match &config.holiday_file {
        Some(path) => HolidayCalendar::load_from_file(path)
            .with_context(|| format!("Loading holiday table {:?}", path))?,
        None => {
            info!("Using built-in holiday table");
            builtin_calendar().clone()
        }
    };

    let store = TrackerStore::new(config.data_file.clone());
    store.load_from_disk().context("Restoring store snapshot")?;
    seed_supervisor(&store, &config);

    let auth = AuthService::new(config.session_ttl_hours);
    tokio::spawn(run_session_sweeper(auth.clone()));

    let state = AppState {
        store,
        auth,
        calendar: Arc::new(calendar),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("Parsing bind address")?;

    match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => {
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .context("Loading TLS certificate and key")?;
            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")?;
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Binding {}", addr))?;
            info!("Listening on http://{}", addr);
            axum::serve(listener, app).await.context("HTTP server failed")?;
        }
    }

    Ok(())
}

/// Creates the supervisor account named in the configuration, once. Without
/// a seed there is no way to reach the supervisor endpoints, since
/// registration only creates trainees.
fn seed_supervisor(store: &TrackerStore, config: &AppConfig) {
    let (Some(email), Some(password)) = (&config.supervisor_email, &config.supervisor_password)
    else {
        warn!("No supervisor seed configured (SUPERVISOR_EMAIL / SUPERVISOR_PASSWORD); supervisor endpoints will be unreachable");
        return;
    };
    if store.find_user_by_email(email).is_some() {
        return;
    }
    let salt = auth::generate_salt();
    let account = UserAccount {
        id: auth::generate_id("sup"),
        name: config
            .supervisor_name
            .clone()
            .unwrap_or_else(|| "Supervisor".to_string()),
        email: email.clone(),
        role: Role::Supervisor,
        password_hash: auth::hash_password(password, &salt),
        salt,
        created_at: Utc::now(),
    };
    match store.insert_user(account) {
        Ok(()) => info!("Seeded supervisor account {}", email),
        Err(e) => warn!("Could not seed supervisor account: {}", e),
    }
}

async fn run_session_sweeper(auth: AuthService) {
    info!("Starting background session sweeper");
    loop {
        tokio::time::sleep(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS)).await;
        let removed = auth.sweep_expired();
        if removed == 0 {
            info!("Session sweep: nothing to remove");
        }
    }
}
