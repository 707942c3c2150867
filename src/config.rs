// src/config.rs
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_session_ttl_hours() -> u64 {
    12
}

/// Service configuration, sourced from the environment (and `.env` in
/// development). Every knob has a default except the optional file paths
/// and the supervisor seed, which stay off unless set.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
    /// JSON snapshot the store persists to; in-memory only when unset.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    /// External holiday table replacing the built-in one.
    #[serde(default)]
    pub holiday_file: Option<PathBuf>,
    #[serde(default)]
    pub supervisor_name: Option<String>,
    #[serde(default)]
    pub supervisor_email: Option<String>,
    #[serde(default)]
    pub supervisor_password: Option<String>,
    #[serde(default)]
    pub tls_cert_path: Option<PathBuf>,
    #[serde(default)]
    pub tls_key_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::from_env::<AppConfig>()
    }

    /// Command-line flags override whatever the environment said.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.server_host = host.clone();
        }
        if let Some(port) = args.port {
            self.server_port = port;
        }
        if let Some(data_file) = &args.data_file {
            self.data_file = Some(data_file.clone());
        }
        if let Some(holiday_file) = &args.holiday_file {
            self.holiday_file = Some(holiday_file.clone());
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "stint-core",
    about = "Work-hour progress tracking service for internships and OJT programs"
)]
pub struct CliArgs {
    /// Bind address, overrides SERVER_HOST.
    #[arg(long)]
    pub host: Option<String>,
    /// Bind port, overrides SERVER_PORT.
    #[arg(long)]
    pub port: Option<u16>,
    /// Store snapshot file, overrides DATA_FILE.
    #[arg(long)]
    pub data_file: Option<PathBuf>,
    /// Holiday table JSON, overrides HOLIDAY_FILE.
    #[arg(long)]
    pub holiday_file: Option<PathBuf>,
}
