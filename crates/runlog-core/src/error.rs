//! Error types for runlog-core.

use runlog_state::StorageError;

/// Positional context could not be turned into a [`LogContext`](crate::LogContext).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("no context values supplied: a component is required")]
    MissingComponent,

    #[error("too many context values: got {count}, at most 4 are accepted")]
    TooManyValues { count: usize },

    #[error("context field `{field}` cannot hold {found}")]
    InvalidField { field: &'static str, found: String },
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: unknown log level `{value}`")]
    InvalidLevel { key: String, value: String },

    #[error("{key}: expected a non-negative integer, got `{value}`")]
    InvalidNumber { key: String, value: String },
}

/// Failure of [`ArtifactRetentionStore`](crate::ArtifactRetentionStore) operations.
///
/// Only the insert and read paths produce this; sweep failures are reported
/// through tracing and never returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetentionError {
    #[error("artifact insert failed for {key}: {source}")]
    Insert { key: String, source: StorageError },

    #[error("artifact read failed for {key}: {source}")]
    Read { key: String, source: StorageError },
}

/// Failure of a [`ReportCallback`](crate::ReportCallback) epoch.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("rendering report `{group}` failed: {source}")]
    Render {
        group: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Retention(#[from] RetentionError),
}

/// Failure while building a [`Logger`](crate::Logger).
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("cannot open log file {path}: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("the persistence sink needs a running tokio runtime")]
    NoRuntime,
}
