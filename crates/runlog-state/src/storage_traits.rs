//! Storage trait definitions for runlog
//!
//! These traits define the two persistence collaborators the core needs:
//! - `LogStore`: append-only log entry persistence with a filtered read side
//! - `ArtifactStore`: per-epoch artifact rows keyed by `(task, group)`
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Log severity, ordered from least to most severe.
///
/// The numeric codes are the ones persisted in the `level` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Persisted numeric code (10, 20, 30, 40, 50).
    pub fn code(self) -> u8 {
        match self {
            Level::Debug => 10,
            Level::Info => 20,
            Level::Warning => 30,
            Level::Error => 40,
            Level::Critical => 50,
        }
    }

    /// Inverse of [`Level::code`].
    pub fn from_code(code: u8) -> StorageResult<Self> {
        match code {
            10 => Ok(Level::Debug),
            20 => Ok(Level::Info),
            30 => Ok(Level::Warning),
            40 => Ok(Level::Error),
            50 => Ok(Level::Critical),
            other => Err(StorageError::UnknownLevel { code: other }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(pub String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" => Ok(Level::Critical),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// LogStore: Log Entry Persistence
// ---------------------------------------------------------------------------

/// A single decoded, persisted log record.
///
/// Invariant (upheld by the producer): `step` implies `task`, `task`
/// implies `computer`. `component` is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Substituted message, at most 4000 characters
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    /// Integer code of the emitting subsystem
    pub component: i32,
    /// Machine that emitted the line
    pub computer: Option<String>,
    /// Unit of work that emitted the line
    pub task: Option<i64>,
    /// Progress counter within the task
    pub step: Option<i64>,
    /// Dotted module path, optionally suffixed with `:function`
    pub module: String,
    pub line: u32,
}

/// Filter for reading log entries back. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub task: Option<i64>,
    pub computer: Option<String>,
    pub component: Option<i32>,
    pub min_level: Option<Level>,
    /// Maximum number of rows, newest first
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn for_task(task: i64) -> Self {
        Self {
            task: Some(task),
            ..Self::default()
        }
    }

    /// Whether `entry` passes every populated filter.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        self.task.map_or(true, |t| entry.task == Some(t))
            && self
                .computer
                .as_deref()
                .map_or(true, |c| entry.computer.as_deref() == Some(c))
            && self.component.map_or(true, |c| entry.component == c)
            && self.min_level.map_or(true, |l| entry.level >= l)
    }
}

/// Append-only log persistence.
///
/// Guarantees:
/// - `append` either stores the entry unchanged or returns an error.
/// - Entries are never updated.
/// - `query` returns entries newest first, truncated to `limit`.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persist one entry.
    async fn append(&self, entry: LogEntry) -> StorageResult<()>;

    /// Read entries matching the query, newest first.
    async fn query(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>>;
}

// ---------------------------------------------------------------------------
// ArtifactStore: Retained Artifacts
// ---------------------------------------------------------------------------

/// Unique identifier for one stored artifact row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl ArtifactId {
    /// Generate a new random ArtifactId
    pub fn new() -> Self {
        ArtifactId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Retention identity of an artifact: one live series per `(task, group)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub task: i64,
    pub group: String,
}

impl ArtifactKey {
    pub fn new(task: i64, group: impl Into<String>) -> Self {
        Self {
            task,
            group: group.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.task, self.group)
    }
}

/// One stored evaluation artifact (for example a rendered report image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub task: i64,
    /// Series name, e.g. a metric name
    pub group: String,
    /// Progress marker within the series
    pub epoch: i64,
    pub project: i64,
    pub dag: i64,
    /// Opaque payload bytes
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.task, self.group.clone())
    }
}

/// Artifact persistence.
///
/// Guarantees:
/// - `insert` makes the artifact visible to every subsequent read.
/// - `delete_where` removes exactly the rows of `key` with `epoch <= max_epoch`
///   and reports how many were removed.
/// - `latest` returns a row with the highest epoch for `key`; among rows
///   tied on that epoch the most recently created one wins.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store a new artifact row.
    async fn insert(&self, artifact: Artifact) -> StorageResult<()>;

    /// Delete every row of `key` whose epoch is `<= max_epoch`.
    async fn delete_where(&self, key: &ArtifactKey, max_epoch: i64) -> StorageResult<usize>;

    /// Highest epoch currently stored for `key`.
    async fn max_epoch(&self, key: &ArtifactKey) -> StorageResult<Option<i64>>;

    /// Highest-epoch row for `key`, if any.
    async fn latest(&self, key: &ArtifactKey) -> StorageResult<Option<Artifact>>;

    /// All rows for `key`, ascending by epoch.
    async fn list(&self, key: &ArtifactKey) -> StorageResult<Vec<Artifact>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
    }

    #[test]
    fn level_codes_round_trip() {
        for level in [
            Level::Debug,
            Level::Info,
            Level::Warning,
            Level::Error,
            Level::Critical,
        ] {
            assert_eq!(Level::from_code(level.code()).unwrap(), level);
        }
        assert_eq!(
            Level::from_code(15).unwrap_err(),
            StorageError::UnknownLevel { code: 15 }
        );
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!(" Warn ".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!("CRITICAL".parse::<Level>().unwrap(), Level::Critical);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn log_query_matches_populated_filters_only() {
        let entry = LogEntry {
            message: "m".to_string(),
            timestamp: Utc::now(),
            level: Level::Warning,
            component: 2,
            computer: Some("node-1".to_string()),
            task: Some(7),
            step: None,
            module: "train".to_string(),
            line: 1,
        };

        assert!(LogQuery::default().matches(&entry));
        assert!(LogQuery::for_task(7).matches(&entry));
        assert!(!LogQuery::for_task(8).matches(&entry));

        let by_level = LogQuery {
            min_level: Some(Level::Error),
            ..LogQuery::default()
        };
        assert!(!by_level.matches(&entry));

        let by_computer = LogQuery {
            computer: Some("node-1".to_string()),
            component: Some(2),
            ..LogQuery::default()
        };
        assert!(by_computer.matches(&entry));
    }
}
