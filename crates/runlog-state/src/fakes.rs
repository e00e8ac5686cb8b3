//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryLogStore` and `MemoryArtifactStore` that satisfy the trait
//! contracts without any external dependencies. Both can be told to fail or
//! stall so that callers' error paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

fn injected(operation: &str) -> StorageError {
    StorageError::Backend(format!("injected failure: {operation}"))
}

// ---------------------------------------------------------------------------
// MemoryLogStore
// ---------------------------------------------------------------------------

/// In-memory log store backed by a `Vec<LogEntry>` in append order.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<LogEntry>>,
    fail_appends: AtomicBool,
    append_delay_ms: AtomicU64,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append` fail with a backend error.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every subsequent `append`.
    pub fn set_append_delay(&self, delay: Duration) {
        self.append_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Snapshot of every stored entry in append order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: LogEntry) -> StorageResult<()> {
        let delay = self.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(injected("append"));
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    async fn query(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
        let entries = self.entries.lock().unwrap();
        let mut matched: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// In-memory artifact store backed by a `HashMap<ArtifactKey, Vec<Artifact>>`.
///
/// Rows of one key are kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    rows: Mutex<HashMap<ArtifactKey, Vec<Artifact>>>,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
    insert_delay_ms: AtomicU64,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert` fail with a backend error.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete_where` fail with a backend error.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every subsequent `insert`.
    pub fn set_insert_delay(&self, delay: Duration) {
        self.insert_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Total number of stored rows across all keys.
    pub fn total_rows(&self) -> usize {
        self.rows.lock().unwrap().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn insert(&self, artifact: Artifact) -> StorageResult<()> {
        let delay = self.insert_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected("insert"));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.entry(artifact.key()).or_default().push(artifact);
        Ok(())
    }

    async fn delete_where(&self, key: &ArtifactKey, max_epoch: i64) -> StorageResult<usize> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete_where"));
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(series) = rows.get_mut(key) else {
            return Ok(0);
        };
        let before = series.len();
        series.retain(|a| a.epoch > max_epoch);
        let removed = before - series.len();
        if series.is_empty() {
            rows.remove(key);
        }
        Ok(removed)
    }

    async fn max_epoch(&self, key: &ArtifactKey) -> StorageResult<Option<i64>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .get(key)
            .and_then(|series| series.iter().map(|a| a.epoch).max()))
    }

    async fn latest(&self, key: &ArtifactKey) -> StorageResult<Option<Artifact>> {
        let rows = self.rows.lock().unwrap();
        // max_by_key keeps the last maximum, i.e. the most recent insert
        Ok(rows
            .get(key)
            .and_then(|series| series.iter().max_by_key(|a| a.epoch).cloned()))
    }

    async fn list(&self, key: &ArtifactKey) -> StorageResult<Vec<Artifact>> {
        let rows = self.rows.lock().unwrap();
        let mut series = rows.get(key).cloned().unwrap_or_default();
        series.sort_by_key(|a| a.epoch);
        Ok(series)
    }
}
