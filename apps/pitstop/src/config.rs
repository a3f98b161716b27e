//! Application configuration

use std::{path::PathBuf, str::FromStr};

use entities::DEFAULT_REMINDER_THRESHOLD_KM;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database path
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Number of background workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Pending jobs allowed per worker before submitters wait
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Remaining distance at or below which a reminder is raised
    #[serde(default = "default_reminder_threshold_km")]
    pub reminder_threshold_km: u32,

    /// Seconds between background reminder checks
    #[serde(default = "default_reminder_interval_secs")]
    pub reminder_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Signed-in user id supplied by the authentication provider
    #[serde(default)]
    pub user_uid: Option<String>,

    /// Signed-in user email
    #[serde(default)]
    pub user_email: Option<String>,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pitstop")
        .join("pitstop.db")
}

fn default_worker_count() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_reminder_threshold_km() -> u32 {
    DEFAULT_REMINDER_THRESHOLD_KM
}

fn default_reminder_interval_secs() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            reminder_threshold_km: default_reminder_threshold_km(),
            reminder_interval_secs: default_reminder_interval_secs(),
            log_level: default_log_level(),
            user_uid: None,
            user_email: None,
        }
    }
}

/// Parses a numeric environment value, keeping `current` when it is malformed.
fn parse_or<T: FromStr>(name: &str, value: &str, current: T) -> T {
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::warn!(variable = name, value, "Ignoring malformed environment value");
            current
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let file_config = match Self::find_config_file() {
            Some(path) => Some(Self::from_file(&path)?),
            None => None,
        };

        let config = Self::merge(file_config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file; missing keys take their defaults.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Layers environment values over the file config (or defaults).
    ///
    /// Environment takes precedence over the file, the file over defaults.
    pub fn merge(file_config: Option<Self>, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = file_config.unwrap_or_default();

        if let Some(path) = env("PITSTOP_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(val) = env("PITSTOP_WORKER_COUNT") {
            config.worker_count = parse_or("PITSTOP_WORKER_COUNT", &val, config.worker_count);
        }

        if let Some(val) = env("PITSTOP_QUEUE_CAPACITY") {
            config.queue_capacity = parse_or("PITSTOP_QUEUE_CAPACITY", &val, config.queue_capacity);
        }

        if let Some(val) = env("PITSTOP_REMINDER_THRESHOLD_KM") {
            config.reminder_threshold_km = parse_or(
                "PITSTOP_REMINDER_THRESHOLD_KM",
                &val,
                config.reminder_threshold_km,
            );
        }

        if let Some(val) = env("PITSTOP_REMINDER_INTERVAL_SECS") {
            config.reminder_interval_secs = parse_or(
                "PITSTOP_REMINDER_INTERVAL_SECS",
                &val,
                config.reminder_interval_secs,
            );
        }

        if let Some(level) = env("PITSTOP_LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(uid) = env("PITSTOP_USER_UID") {
            config.user_uid = Some(uid);
        }

        if let Some(email) = env("PITSTOP_USER_EMAIL") {
            config.user_email = Some(email);
        }

        config
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let locations = [
            PathBuf::from("pitstop.toml"),
            dirs::config_dir()
                .map(|p| p.join("pitstop").join("pitstop.toml"))
                .unwrap_or_default(),
        ];

        locations.into_iter().find(|p| p.is_file())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1"));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be at least 1"));
        }

        if self.reminder_threshold_km == 0 {
            return Err(ConfigError::Invalid("reminder_threshold_km must be at least 1"));
        }

        if self.reminder_interval_secs == 0 {
            return Err(ConfigError::Invalid("reminder_interval_secs must be at least 1"));
        }

        if self.user_uid.is_some() && self.user_email.is_none() {
            tracing::warn!("PITSTOP_USER_UID is set without an email; using an empty one");
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),

    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
