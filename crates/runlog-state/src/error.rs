//! Error types for runlog-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the backing database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by [`LogStore`](crate::LogStore) and
/// [`ArtifactStore`](crate::ArtifactStore) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The operation did not finish within its budget
    #[error("storage operation `{operation}` timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// A stored row could not be converted to or from its domain type
    #[error("stored row is malformed: {0}")]
    Corrupt(String),

    /// An unknown severity code was read back from storage
    #[error("unknown log level code: {code}")]
    UnknownLevel { code: u8 },
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
