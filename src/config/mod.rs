use std::env;
use std::path::PathBuf;

use crate::history::{Capacity, HistoryConfig};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Back event name and size limit.
    pub history: HistoryConfig,
    /// Start capturing as soon as the server starts.
    pub autostart: bool,
    /// Snapshot database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Snapshot database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Connection pool size.
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let history = HistoryConfig {
            back_event: env::var("VIEW_HISTORY_BACK_EVENT").unwrap_or_else(|_| "back".to_string()),
            max_size: Capacity::from_setting(env::var("VIEW_HISTORY_MAX_SIZE").ok().as_deref()),
        };

        let autostart = env::var("VIEW_HISTORY_AUTOSTART")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("SNAPSHOT_DATABASE_PATH").unwrap_or_else(|_| "./data/history.db".to_string()),
            ),
            max_connections: env::var("SNAPSHOT_DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Config {
            history,
            autostart,
            database,
            logging,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            autostart: true,
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/history.db"),
            max_connections: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
