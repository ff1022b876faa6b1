//! Core runtime configuration.
//!
//! Resolved once when the core is opened and passed into services. Nothing
//! reads environment variables after startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cache::ReconcilePolicy;
use crate::editor::DEFAULT_REMINDER_MINUTES;
use crate::reminders::DEFAULT_MIN_LEAD;

/// Database path that selects an in-memory store.
pub const IN_MEMORY: &str = ":memory:";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_min_lead_secs() -> u64 {
    DEFAULT_MIN_LEAD.as_secs()
}

fn default_reminder_minutes() -> Option<i64> {
    Some(DEFAULT_REMINDER_MINUTES)
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Core configuration resolved at startup.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// SQLite file, or `:memory:`
    pub database_path: String,
    /// Directory uploaded files are written below
    pub blob_root: PathBuf,
    #[serde(default)]
    pub reconcile: ReconcilePolicy,
    #[serde(default = "default_min_lead_secs")]
    pub reminder_min_lead_secs: u64,
    /// Lead time pre-filled for new appointments
    #[serde(default = "default_reminder_minutes")]
    pub default_reminder_minutes: Option<i64>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl CoreConfig {
    /// Defaults around an in-memory database.
    pub fn in_memory(blob_root: impl Into<PathBuf>) -> Self {
        Self {
            database_path: IN_MEMORY.to_string(),
            blob_root: blob_root.into(),
            reconcile: ReconcilePolicy::default(),
            reminder_min_lead_secs: default_min_lead_secs(),
            default_reminder_minutes: default_reminder_minutes(),
            log_filter: default_log_filter(),
        }
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path cannot be empty".into()));
        }
        if self.blob_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("blob_root cannot be empty".into()));
        }
        if matches!(self.default_reminder_minutes, Some(m) if m < 0) {
            return Err(ConfigError::Invalid(
                "default_reminder_minutes cannot be negative".into(),
            ));
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_filter) {
            return Err(ConfigError::Invalid(format!("log_filter: {}", e)));
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == IN_MEMORY
    }

    pub fn reminder_min_lead(&self) -> Duration {
        Duration::from_secs(self.reminder_min_lead_secs)
    }
}
