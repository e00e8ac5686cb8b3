//! runlog core library
//!
//! Turns log calls from many concurrent workers into structured rows, and
//! keeps exactly one live evaluation artifact per `(task, group)`.
//!
//! ## Key Components
//!
//! - [`Logger`] and the `log_*!` macros: one explicit handle fanning events
//!   out to console, rotating file and the persistence [`LogSink`]
//! - [`LogContext`] and [`decode`]: structured call context, plus the
//!   positional compatibility convention
//! - [`RecordFormatter`]: substitution and one-shot trace rendering
//! - [`ArtifactRetentionStore`]: insert-then-sweep retention
//! - [`ReportCallback`]: epoch-driven artifact producer

pub mod config;
pub mod context;
pub mod destination;
pub mod error;
pub mod format;
pub mod logger;
pub mod obs;
pub mod report;
pub mod retention;
pub mod rotating_file;
pub mod sink;
pub mod telemetry;

pub use config::{LoggingConfig, SinkConfig, LOG_FILE_NAME};
pub use context::{decode, Component, ComponentType, LogArg, LogContext, SourceLocation};
pub use destination::{ConsoleDestination, Destination, SharedBuffer};
pub use error::{ConfigError, DecodeError, LoggerError, ReportError, RetentionError};
pub use format::{
    ErrorChainRenderer, FormatMode, FormattedEvent, RawEvent, RecordFormatter, TraceRenderer,
};
pub use logger::{Logger, LoggerBuilder};
pub use report::{ReportCallback, ReportRenderer, VALID_LOADER};
pub use retention::{ArtifactRetentionStore, NewArtifact, PutOutcome, DEFAULT_STORE_TIMEOUT};
pub use rotating_file::RotatingFileDestination;
pub use sink::{LogSink, MAX_MESSAGE_CHARS};

pub use runlog_state::Level;
