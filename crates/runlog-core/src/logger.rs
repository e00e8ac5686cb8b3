//! The process logging handle.
//!
//! A [`Logger`] is built once at startup with a fixed set of destinations,
//! passed by reference to every call site, and shut down at exit so that
//! queued records reach the store. There is no global registry.
//!
//! ```ignore
//! let logger = Logger::from_config(&LoggingConfig::from_env()?, store)?;
//! let ctx = LogContext::task(ComponentType::Worker, "node-1", 42);
//! log_info!(logger, ctx = ctx, "epoch {} finished", 3);
//! // positional form, kept for older call sites
//! log_info!(logger, "task started", ComponentType::Worker, "node-1", 42);
//! logger.shutdown().await;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use runlog_state::{Level, LogStore};

use crate::config::{LoggingConfig, SinkConfig};
use crate::destination::{ConsoleDestination, Destination};
use crate::error::LoggerError;
use crate::format::{RawEvent, RecordFormatter, TraceRenderer};
use crate::rotating_file::RotatingFileDestination;
use crate::sink::LogSink;

/// Explicit logging handle with a fixed set of destinations.
pub struct Logger {
    formatter: RecordFormatter,
    destinations: Vec<Arc<dyn Destination>>,
    sink: Option<Arc<LogSink>>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Console, rotating file and persistence sink as configured.
    ///
    /// Must be called inside a tokio runtime (the sink spawns its worker).
    pub fn from_config(
        config: &LoggingConfig,
        store: Arc<dyn LogStore>,
    ) -> Result<Self, LoggerError> {
        Self::builder()
            .console(config.console_level)
            .file(
                config.log_file(),
                config.file_level,
                config.file_max_bytes,
                config.file_backup_count,
            )
            .sink(store, config.db_level, config.sink.clone())
            .build()
    }

    /// Format `event` once and hand it to every destination whose threshold
    /// admits it.
    pub fn log(&self, event: RawEvent) {
        let level = event.level;
        if self.destinations.iter().all(|d| level < d.min_level()) {
            return;
        }
        let formatted = self.formatter.format(event);
        for destination in &self.destinations {
            if level >= destination.min_level() {
                destination.emit(&formatted);
            }
        }
    }

    pub fn destination_names(&self) -> Vec<&str> {
        self.destinations.iter().map(|d| d.name()).collect()
    }

    /// Drain the persistence sink. Records logged afterwards are not stored.
    pub async fn shutdown(&self) {
        if let Some(sink) = &self.sink {
            sink.shutdown().await;
        }
    }
}

enum Planned {
    Ready(Arc<dyn Destination>),
    File {
        path: PathBuf,
        level: Level,
        max_bytes: u64,
        backup_count: usize,
    },
    Sink {
        store: Arc<dyn LogStore>,
        level: Level,
        config: SinkConfig,
    },
}

/// Builder for [`Logger`]. Destinations receive events in the order added.
#[derive(Default)]
pub struct LoggerBuilder {
    renderer: Option<Arc<dyn TraceRenderer>>,
    planned: Vec<Planned>,
}

impl LoggerBuilder {
    /// Replace the default [`ErrorChainRenderer`](crate::ErrorChainRenderer).
    pub fn trace_renderer(mut self, renderer: Arc<dyn TraceRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Plain lines to stdout.
    pub fn console(self, level: Level) -> Self {
        self.destination(Arc::new(ConsoleDestination::stdout(level)))
    }

    /// Plain lines to a size-bounded file.
    pub fn file(
        mut self,
        path: impl Into<PathBuf>,
        level: Level,
        max_bytes: u64,
        backup_count: usize,
    ) -> Self {
        self.planned.push(Planned::File {
            path: path.into(),
            level,
            max_bytes,
            backup_count,
        });
        self
    }

    /// Persist through `store`.
    pub fn sink(mut self, store: Arc<dyn LogStore>, level: Level, config: SinkConfig) -> Self {
        self.planned.push(Planned::Sink {
            store,
            level,
            config,
        });
        self
    }

    /// Any other destination.
    pub fn destination(mut self, destination: Arc<dyn Destination>) -> Self {
        self.planned.push(Planned::Ready(destination));
        self
    }

    pub fn build(self) -> Result<Logger, LoggerError> {
        let formatter = match self.renderer {
            Some(renderer) => RecordFormatter::new(renderer),
            None => RecordFormatter::default(),
        };
        let mut destinations: Vec<Arc<dyn Destination>> = Vec::with_capacity(self.planned.len());
        let mut sink = None;

        for planned in self.planned {
            match planned {
                Planned::Ready(destination) => destinations.push(destination),
                Planned::File {
                    path,
                    level,
                    max_bytes,
                    backup_count,
                } => destinations.push(Arc::new(RotatingFileDestination::open(
                    path,
                    level,
                    max_bytes,
                    backup_count,
                )?)),
                Planned::Sink {
                    store,
                    level,
                    config,
                } => {
                    let spawned = Arc::new(LogSink::spawn(store, level, &config)?);
                    destinations.push(spawned.clone());
                    sink = Some(spawned);
                }
            }
        }

        Ok(Logger {
            formatter,
            destinations,
            sink,
        })
    }
}

/// Log at an explicit level.
///
/// `log_at!(logger, level, ctx = context, "template {}", args...)` uses an
/// explicit [`LogContext`](crate::LogContext); without `ctx = ...` the
/// arguments are positional context values (component, computer, task, step).
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, ctx = $ctx:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $crate::RawEvent::new($level, $template, $crate::here!())
                .with_context($ctx)
                .with_args(vec![$($crate::LogArg::from($arg)),*]),
        )
    };
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $crate::RawEvent::new($level, $template, $crate::here!())
                .with_args(vec![$($crate::LogArg::from($arg)),*]),
        )
    };
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Debug, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Info, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Warning, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Error, $($rest)+)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log_at!($logger, $crate::Level::Critical, $($rest)+)
    };
}
