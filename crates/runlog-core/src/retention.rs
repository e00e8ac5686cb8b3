//! Artifact retention: keep only the newest artifact per `(task, group)`.
//!
//! Every `put` inserts first and sweeps second. The sweep bound is derived
//! from the maximum epoch the store holds *after* the insert, so the sweep
//! only ever deletes rows strictly below an epoch that exists. Concurrent
//! writers in other processes can therefore only ever remove superseded rows,
//! and the last sweep to run leaves exactly the maximum-epoch rows.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use runlog_state::{Artifact, ArtifactId, ArtifactKey, ArtifactStore, StorageError, StorageResult};
use tracing::Instrument;

use crate::error::RetentionError;
use crate::obs;

/// Default budget for each store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(2000);

/// An artifact as handed over by its producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArtifact {
    pub task: i64,
    pub group: String,
    pub epoch: i64,
    pub payload: Vec<u8>,
    pub project: i64,
    pub dag: i64,
}

impl NewArtifact {
    pub fn new(task: i64, group: impl Into<String>, epoch: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            task,
            group: group.into(),
            epoch,
            payload: payload.into(),
            project: 0,
            dag: 0,
        }
    }

    pub fn in_project(mut self, project: i64, dag: i64) -> Self {
        self.project = project;
        self.dag = dag;
        self
    }

    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(self.task, self.group.clone())
    }
}

/// What a successful `put` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// Epoch of the inserted row.
    pub epoch: i64,
    /// Rows removed by the sweep.
    pub superseded: usize,
    /// The sweep failed and stale rows may remain until the next `put`.
    pub sweep_failed: bool,
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

/// Insert-then-sweep coordinator over an [`ArtifactStore`].
pub struct ArtifactRetentionStore {
    store: Arc<dyn ArtifactStore>,
    timeout: Duration,
    locks: Mutex<HashMap<ArtifactKey, KeyLock>>,
}

impl ArtifactRetentionStore {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_STORE_TIMEOUT,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Persist `artifact`, then retire every older row for its key.
    ///
    /// Fails only when the insert fails or times out. A failed sweep is
    /// reported through tracing and flagged in the outcome.
    pub async fn put(&self, artifact: NewArtifact) -> Result<PutOutcome, RetentionError> {
        let span = obs::put_span(artifact.task, &artifact.group, artifact.epoch);
        let key = artifact.key();
        let lock = self.key_lock(&key);

        let outcome = async {
            let _guard = lock.lock().await;
            self.insert_then_sweep(key.clone(), artifact).await
        }
        .instrument(span)
        .await;

        drop(lock);
        self.release_key_lock(&key);
        outcome
    }

    /// Highest-epoch surviving artifact for the key, if any.
    pub async fn get_latest(
        &self,
        task: i64,
        group: &str,
    ) -> Result<Option<Artifact>, RetentionError> {
        let key = ArtifactKey::new(task, group);
        self.bounded("latest", self.store.latest(&key))
            .await
            .map_err(|source| RetentionError::Read {
                key: key.to_string(),
                source,
            })
    }

    async fn insert_then_sweep(
        &self,
        key: ArtifactKey,
        artifact: NewArtifact,
    ) -> Result<PutOutcome, RetentionError> {
        let epoch = artifact.epoch;
        let bytes = artifact.payload.len();
        let row = Artifact {
            id: ArtifactId::new(),
            task: artifact.task,
            group: artifact.group,
            epoch,
            project: artifact.project,
            dag: artifact.dag,
            payload: artifact.payload,
            created_at: Utc::now(),
        };

        if let Err(source) = self.bounded("insert", self.store.insert(row)).await {
            obs::emit_insert_failed(key.task, &key.group, epoch, &source);
            return Err(RetentionError::Insert {
                key: key.to_string(),
                source,
            });
        }
        obs::emit_artifact_stored(key.task, &key.group, epoch, bytes);

        let (superseded, sweep_failed) = match self.sweep(&key).await {
            Ok(removed) => (removed, false),
            Err(e) => {
                obs::emit_sweep_failed(key.task, &key.group, &e);
                (0, true)
            }
        };

        Ok(PutOutcome {
            epoch,
            superseded,
            sweep_failed,
        })
    }

    async fn sweep(&self, key: &ArtifactKey) -> StorageResult<usize> {
        let Some(max) = self.bounded("max_epoch", self.store.max_epoch(key)).await? else {
            return Ok(0);
        };
        let Some(bound) = max.checked_sub(1) else {
            return Ok(0);
        };
        let removed = self
            .bounded("delete_where", self.store.delete_where(key, bound))
            .await?;
        if removed > 0 {
            obs::emit_artifact_swept(key.task, &key.group, max, removed);
        }
        Ok(removed)
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                operation: operation.to_string(),
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }

    fn key_lock(&self, key: &ArtifactKey) -> KeyLock {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    /// Drop the key's lock entry once no other `put` holds or waits on it.
    fn release_key_lock(&self, key: &ArtifactKey) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlog_state::fakes::MemoryArtifactStore;

    #[tokio::test]
    async fn put_releases_its_key_lock() {
        let store = ArtifactRetentionStore::new(Arc::new(MemoryArtifactStore::new()));
        store
            .put(NewArtifact::new(1, "pr_curve", 1, b"a".to_vec()))
            .await
            .unwrap();
        assert_eq!(store.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn new_artifact_defaults_project_and_dag() {
        let artifact = NewArtifact::new(4, "roc", 2, b"x".to_vec()).in_project(9, 11);
        assert_eq!(artifact.key(), ArtifactKey::new(4, "roc"));
        assert_eq!((artifact.project, artifact.dag), (9, 11));
        assert_eq!(NewArtifact::new(4, "roc", 2, Vec::new()).project, 0);
    }
}
