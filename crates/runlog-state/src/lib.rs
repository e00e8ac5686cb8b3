//! runlog-state: persistence layer for runlog
//!
//! This crate owns every row runlog writes: decoded log entries and retained
//! evaluation artifacts. The core crate only talks to it through the
//! [`LogStore`] and [`ArtifactStore`] traits.
//!
//! ## Key Components
//!
//! - `storage_traits`: domain rows (`LogEntry`, `Artifact`, `Level`) and the store traits
//! - `fakes`: in-memory stores with failure injection, for tests
//! - `SurrealHandle`: connection management; hands out `SurrealLogStore`
//!   and `SurrealArtifactStore`

mod error;
pub mod fakes;
mod handle;
mod migrations;
mod schema;
pub mod storage_traits;
mod surreal_artifacts;
mod surreal_logs;

pub use error::{StateError, StorageError};
pub use handle::{CloudConfig, SurrealHandle};
pub use storage_traits::{
    Artifact, ArtifactId, ArtifactKey, ArtifactStore, Level, LogEntry, LogQuery, LogStore,
    ParseLevelError, StorageResult,
};
pub use surreal_artifacts::SurrealArtifactStore;
pub use surreal_logs::SurrealLogStore;

/// Result type for connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
