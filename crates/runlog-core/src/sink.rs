//! Persistence sink: the destination that turns events into stored rows.
//!
//! `emit` does the cheap work on the caller's thread (level filter, code-root
//! filter, context decoding, truncation) and hands the finished [`LogEntry`]
//! to a background worker over a bounded channel. The worker calls
//! [`LogStore::append`] under a timeout. Nothing on this path can fail the
//! caller: every fault is reported through [`crate::obs`] and the record is
//! dropped.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use runlog_state::{Level, LogEntry, LogStore};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::SinkConfig;
use crate::context;
use crate::destination::Destination;
use crate::error::LoggerError;
use crate::format::{FormatMode, FormattedEvent};
use crate::obs;

/// Longest message persisted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// First `max_chars` characters of `message`.
pub fn truncate_chars(mut message: String, max_chars: usize) -> String {
    if let Some((cut, _)) = message.char_indices().nth(max_chars) {
        message.truncate(cut);
    }
    message
}

/// Destination that persists events through a [`LogStore`].
pub struct LogSink {
    level: Level,
    code_root: PathBuf,
    sender: Mutex<Option<mpsc::Sender<LogEntry>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LogSink {
    /// Start the sink and its worker on the current tokio runtime.
    pub fn spawn(
        store: Arc<dyn LogStore>,
        level: Level,
        config: &SinkConfig,
    ) -> Result<Self, LoggerError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LoggerError::NoRuntime)?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = runtime.spawn(run_worker(store, receiver, config.store_timeout));
        Ok(Self {
            level,
            code_root: config.code_root.clone(),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Build the row for `event`, or `None` when it must not be persisted.
    fn prepare(&self, event: &FormattedEvent) -> Option<LogEntry> {
        let location = event.location();
        let module = location.dotted_path(&self.code_root)?;

        let raw = event.raw();
        let decoded = match raw.context.clone() {
            Some(explicit) => Ok(explicit),
            None => context::decode(&raw.args),
        };
        let ctx = match decoded {
            Ok(ctx) => ctx,
            Err(e) => {
                obs::emit_sink_fault("decode", &module, &e);
                return None;
            }
        };
        let (component, computer, task, step) = ctx.into_parts();

        Some(LogEntry {
            message: truncate_chars(event.render(FormatMode::Raw), MAX_MESSAGE_CHARS),
            timestamp: raw.timestamp,
            level: raw.level,
            component,
            computer,
            task,
            step,
            module,
            line: location.line,
        })
    }

    fn enqueue(&self, entry: LogEntry) {
        let Ok(guard) = self.sender.lock() else {
            obs::emit_sink_fault("enqueue", &entry.module, &"sender lock poisoned");
            return;
        };
        let Some(sender) = guard.as_ref() else {
            obs::emit_sink_fault("enqueue", &entry.module, &"sink is shut down");
            return;
        };
        match sender.try_send(entry) {
            Ok(()) => {}
            Err(TrySendError::Full(entry)) => {
                obs::emit_sink_fault("enqueue", &entry.module, &"queue full, record dropped");
            }
            Err(TrySendError::Closed(entry)) => {
                obs::emit_sink_fault("enqueue", &entry.module, &"worker stopped, record dropped");
            }
        }
    }

    /// Stop accepting records and wait until the worker has written or
    /// dropped everything already queued.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut s| s.take());
        drop(sender);
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                obs::emit_sink_fault("shutdown", "-", &e);
            }
        }
    }
}

impl Destination for LogSink {
    fn name(&self) -> &str {
        "db"
    }

    fn min_level(&self) -> Level {
        self.level
    }

    fn emit(&self, event: &FormattedEvent) {
        if event.level() < self.level {
            return;
        }
        if let Some(entry) = self.prepare(event) {
            self.enqueue(entry);
        }
    }
}

async fn run_worker(
    store: Arc<dyn LogStore>,
    mut receiver: mpsc::Receiver<LogEntry>,
    budget: Duration,
) {
    while let Some(entry) = receiver.recv().await {
        let module = entry.module.clone();
        match tokio::time::timeout(budget, store.append(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => obs::emit_sink_fault("append", &module, &e),
            Err(_) => obs::emit_sink_fault(
                "timeout",
                &module,
                &format!("append exceeded {}ms", budget.as_millis()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_messages() {
        assert_eq!(truncate_chars("short".to_string(), 10), "short");
        assert_eq!(truncate_chars("exact".to_string(), 5), "exact");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let message = "é".repeat(10);
        let cut = truncate_chars(message, 4);
        assert_eq!(cut, "éééé");
        assert_eq!(cut.chars().count(), 4);
    }

    #[test]
    fn truncate_long_message_to_limit() {
        let message = "x".repeat(MAX_MESSAGE_CHARS + 500);
        let cut = truncate_chars(message, MAX_MESSAGE_CHARS);
        assert_eq!(cut.len(), MAX_MESSAGE_CHARS);
    }
}
