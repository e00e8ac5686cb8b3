//! Environment-driven configuration for the logging stack.
//!
//! Reads:
//! - CONSOLE_LOG_LEVEL (default: DEBUG)
//! - FILE_LOG_LEVEL (default: INFO)
//! - DB_LOG_LEVEL (default: DEBUG)
//! - LOG_FOLDER (default: "logs"), the file destination writes `log.txt` there
//! - LOG_FILE_MAX_BYTES (default: 10485760)
//! - LOG_FILE_BACKUP_COUNT (default: 1)
//! - RUNLOG_CODE_ROOT (default: empty, every file of the local workspace)
//! - RUNLOG_QUEUE_CAPACITY (default: 1024)
//! - RUNLOG_STORE_TIMEOUT_MS (default: 2000)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use runlog_state::Level;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const LOG_FILE_NAME: &str = "log.txt";

/// Settings for every log destination and the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub console_level: Level,
    pub file_level: Level,
    pub db_level: Level,
    pub log_folder: PathBuf,
    pub file_max_bytes: u64,
    pub file_backup_count: usize,
    pub sink: SinkConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: Level::Debug,
            file_level: Level::Info,
            db_level: Level::Debug,
            log_folder: PathBuf::from("logs"),
            file_max_bytes: 10 * 1024 * 1024,
            file_backup_count: 1,
            sink: SinkConfig::default(),
        }
    }
}

/// Settings for the persistence sink and its background worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Only files under this path are persisted. Empty selects every file
    /// of the local workspace.
    pub code_root: PathBuf,
    /// Entries waiting for the worker before new ones are dropped
    pub queue_capacity: usize,
    /// Budget for each append call
    pub store_timeout: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            code_root: PathBuf::new(),
            queue_capacity: 1024,
            store_timeout: Duration::from_millis(2000),
        }
    }
}

fn parse_level(key: &str, value: &str) -> Result<Level, ConfigError> {
    Level::from_str(value).map_err(|_| ConfigError::InvalidLevel {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl LoggingConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("CONSOLE_LOG_LEVEL") {
            config.console_level = parse_level("CONSOLE_LOG_LEVEL", &v)?;
        }
        if let Some(v) = lookup("FILE_LOG_LEVEL") {
            config.file_level = parse_level("FILE_LOG_LEVEL", &v)?;
        }
        if let Some(v) = lookup("DB_LOG_LEVEL") {
            config.db_level = parse_level("DB_LOG_LEVEL", &v)?;
        }
        if let Some(v) = lookup("LOG_FOLDER") {
            config.log_folder = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_FILE_MAX_BYTES") {
            config.file_max_bytes = parse_number("LOG_FILE_MAX_BYTES", &v)?;
        }
        if let Some(v) = lookup("LOG_FILE_BACKUP_COUNT") {
            config.file_backup_count = parse_number("LOG_FILE_BACKUP_COUNT", &v)?;
        }
        if let Some(v) = lookup("RUNLOG_CODE_ROOT") {
            config.sink.code_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("RUNLOG_QUEUE_CAPACITY") {
            config.sink.queue_capacity = parse_number("RUNLOG_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("RUNLOG_STORE_TIMEOUT_MS") {
            let ms: u64 = parse_number("RUNLOG_STORE_TIMEOUT_MS", &v)?;
            config.sink.store_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Path of the rotating log file.
    pub fn log_file(&self) -> PathBuf {
        self.log_folder.join(LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = LoggingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.console_level, Level::Debug);
        assert_eq!(config.file_level, Level::Info);
        assert_eq!(config.db_level, Level::Debug);
        assert_eq!(config.file_max_bytes, 10_485_760);
        assert_eq!(config.file_backup_count, 1);
        assert_eq!(config.log_file(), PathBuf::from("logs/log.txt"));
        assert_eq!(config.sink.code_root, PathBuf::new());
    }

    #[test]
    fn each_threshold_is_independently_overridable() {
        let config = LoggingConfig::from_lookup(lookup(&[
            ("CONSOLE_LOG_LEVEL", "warning"),
            ("FILE_LOG_LEVEL", "ERROR"),
            ("DB_LOG_LEVEL", "info"),
            ("LOG_FOLDER", "/var/log/runlog"),
            ("LOG_FILE_MAX_BYTES", "2048"),
            ("LOG_FILE_BACKUP_COUNT", "3"),
            ("RUNLOG_CODE_ROOT", "crates"),
            ("RUNLOG_QUEUE_CAPACITY", "16"),
            ("RUNLOG_STORE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.console_level, Level::Warning);
        assert_eq!(config.file_level, Level::Error);
        assert_eq!(config.db_level, Level::Info);
        assert_eq!(config.log_file(), PathBuf::from("/var/log/runlog/log.txt"));
        assert_eq!(config.file_max_bytes, 2048);
        assert_eq!(config.file_backup_count, 3);
        assert_eq!(config.sink.code_root, PathBuf::from("crates"));
        assert_eq!(config.sink.queue_capacity, 16);
        assert_eq!(config.sink.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_are_errors() {
        assert_eq!(
            LoggingConfig::from_lookup(lookup(&[("DB_LOG_LEVEL", "loud")])).unwrap_err(),
            ConfigError::InvalidLevel {
                key: "DB_LOG_LEVEL".to_string(),
                value: "loud".to_string(),
            }
        );
        assert!(matches!(
            LoggingConfig::from_lookup(lookup(&[("LOG_FILE_MAX_BYTES", "-1")])),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }
}
