//! Structured observability hooks for runlog's own diagnostics.
//!
//! This is the error channel of every destination: faults that must never
//! reach the logging caller (decode failures, dropped records, store errors)
//! are reported here instead. Artifact lifecycle events go through here too.
//!
//! Events carry an `event` field (`sink.fault`, `artifact.stored`, ...) so
//! they can be filtered downstream.

use tracing::{info, warn, Span};

/// Span covering one artifact `put`, attached with `tracing::Instrument`.
pub fn put_span(task: i64, group: &str, epoch: i64) -> Span {
    tracing::info_span!("artifact.put", task = task, group = %group, epoch = epoch)
}

/// Emit event: the persistence sink dropped a record.
///
/// `stage` names where it failed: `decode`, `enqueue`, `append`, `timeout`.
pub fn emit_sink_fault(stage: &str, module: &str, error: &dyn std::fmt::Display) {
    warn!(event = "sink.fault", stage = %stage, module = %module, error = %error);
}

/// Emit event: a console or file destination failed to write.
pub fn emit_destination_fault(destination: &str, error: &dyn std::fmt::Display) {
    warn!(event = "destination.fault", destination = %destination, error = %error);
}

/// Emit event: the rotating file destination rolled over.
pub fn emit_file_rotated(path: &str, backups: usize) {
    info!(event = "file.rotated", path = %path, backups = backups);
}

/// Emit event: an artifact row was inserted.
pub fn emit_artifact_stored(task: i64, group: &str, epoch: i64, bytes: usize) {
    info!(
        event = "artifact.stored",
        task = task,
        group = %group,
        epoch = epoch,
        bytes = bytes,
    );
}

/// Emit event: superseded artifact rows were removed.
pub fn emit_artifact_swept(task: i64, group: &str, kept_epoch: i64, removed: usize) {
    info!(
        event = "artifact.swept",
        task = task,
        group = %group,
        kept_epoch = kept_epoch,
        removed = removed,
    );
}

/// Emit event: the retention sweep failed; stale rows remain (warning level).
pub fn emit_sweep_failed(task: i64, group: &str, error: &dyn std::fmt::Display) {
    warn!(event = "artifact.sweep_failed", task = task, group = %group, error = %error);
}

/// Emit event: the artifact insert failed and is returned to the producer.
pub fn emit_insert_failed(task: i64, group: &str, epoch: i64, error: &dyn std::fmt::Display) {
    warn!(
        event = "artifact.insert_failed",
        task = task,
        group = %group,
        epoch = epoch,
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_span_carries_name() {
        let span = put_span(1, "pr_curve", 3);
        if let Some(meta) = span.metadata() {
            assert_eq!(meta.name(), "artifact.put");
        }
    }
}
