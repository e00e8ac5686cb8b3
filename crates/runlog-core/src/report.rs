//! Per-epoch report producer feeding [`ArtifactRetentionStore`].
//!
//! A [`ReportCallback`] collects validation batches during an epoch and, at
//! epoch end, renders them into one payload stored under the renderer's
//! group. What the payload contains is up to the [`ReportRenderer`].

use std::sync::Arc;

use crate::error::ReportError;
use crate::retention::{ArtifactRetentionStore, NewArtifact, PutOutcome};

/// Loader whose batches are collected.
pub const VALID_LOADER: &str = "valid";

/// Turns an epoch's batches into an artifact payload.
pub trait ReportRenderer: Send + Sync {
    type Batch: Send;

    /// Artifact group the payload is stored under, e.g. `pr_curve`.
    fn group(&self) -> &str;

    fn render(&self, batches: &[Self::Batch]) -> anyhow::Result<Vec<u8>>;
}

/// Epoch-driven producer bound to one task.
pub struct ReportCallback<R: ReportRenderer> {
    renderer: R,
    retention: Arc<ArtifactRetentionStore>,
    task: i64,
    project: i64,
    dag: i64,
    buffer: Vec<R::Batch>,
}

impl<R: ReportRenderer> ReportCallback<R> {
    pub fn new(
        renderer: R,
        retention: Arc<ArtifactRetentionStore>,
        task: i64,
        project: i64,
        dag: i64,
    ) -> Self {
        Self {
            renderer,
            retention,
            task,
            project,
            dag,
            buffer: Vec::new(),
        }
    }

    /// Keep `batch` if it came from the validation loader.
    pub fn on_batch_end(&mut self, loader: &str, batch: R::Batch) {
        if loader == VALID_LOADER {
            self.buffer.push(batch);
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Render the collected batches and store them as epoch `epoch`.
    ///
    /// Returns `Ok(None)` when nothing was collected. The buffer is emptied
    /// whether or not rendering and storing succeed.
    pub async fn on_epoch_end(&mut self, epoch: i64) -> Result<Option<PutOutcome>, ReportError> {
        let batches = std::mem::take(&mut self.buffer);
        if batches.is_empty() {
            return Ok(None);
        }

        let group = self.renderer.group().to_string();
        let payload = self
            .renderer
            .render(&batches)
            .map_err(|source| ReportError::Render {
                group: group.clone(),
                source,
            })?;

        let artifact =
            NewArtifact::new(self.task, group, epoch, payload).in_project(self.project, self.dag);
        let outcome = self.retention.put(artifact).await?;
        Ok(Some(outcome))
    }
}
