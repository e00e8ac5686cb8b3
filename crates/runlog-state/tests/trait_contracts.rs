//! Trait contract tests for LogStore and ArtifactStore.
//!
//! Every contract runs against the in-memory fakes and against SurrealDB's
//! in-memory engine. Any conforming implementation must pass these.

use chrono::{Duration, Utc};
use runlog_state::fakes::{MemoryArtifactStore, MemoryLogStore};
use runlog_state::storage_traits::*;
use runlog_state::SurrealHandle;

fn entry(message: &str, level: Level, task: Option<i64>) -> LogEntry {
    LogEntry {
        message: message.to_string(),
        timestamp: Utc::now(),
        level,
        component: 1,
        computer: task.map(|_| "node-1".to_string()),
        task,
        step: None,
        module: "trainer.loop:run".to_string(),
        line: 12,
    }
}

fn artifact(task: i64, group: &str, epoch: i64, payload: &[u8]) -> Artifact {
    Artifact {
        id: ArtifactId::new(),
        task,
        group: group.to_string(),
        epoch,
        project: 100,
        dag: 200,
        payload: payload.to_vec(),
        created_at: Utc::now(),
    }
}

// ===========================================================================
// LogStore contracts
// ===========================================================================

async fn log_append_then_query_returns_entry(store: &dyn LogStore) {
    let stored = entry("epoch finished", Level::Info, Some(42));
    store.append(stored.clone()).await.unwrap();

    let all = store.query(&LogQuery::default()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].message, stored.message);
    assert_eq!(all[0].level, Level::Info);
    assert_eq!(all[0].task, Some(42));
    assert_eq!(all[0].computer.as_deref(), Some("node-1"));
    assert_eq!(all[0].module, "trainer.loop:run");
    assert_eq!(all[0].line, 12);
}

async fn log_query_filters_and_orders_newest_first(store: &dyn LogStore) {
    let mut first = entry("first", Level::Debug, Some(1));
    first.timestamp = Utc::now() - Duration::seconds(10);
    let mut second = entry("second", Level::Error, Some(1));
    second.timestamp = Utc::now() - Duration::seconds(5);
    let third = entry("third", Level::Error, Some(2));

    for e in [first, second, third] {
        store.append(e).await.unwrap();
    }

    let task_one = store.query(&LogQuery::for_task(1)).await.unwrap();
    let messages: Vec<&str> = task_one.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["second", "first"]);

    let errors = store
        .query(&LogQuery {
            min_level: Some(Level::Error),
            limit: Some(1),
            ..LogQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "third");
}

#[tokio::test]
async fn memory_log_append_then_query() {
    log_append_then_query_returns_entry(&MemoryLogStore::new()).await;
}

#[tokio::test]
async fn memory_log_query_filters() {
    log_query_filters_and_orders_newest_first(&MemoryLogStore::new()).await;
}

#[tokio::test]
async fn memory_log_injected_failure_stores_nothing() {
    let store = MemoryLogStore::new();
    store.set_fail_appends(true);

    let err = store
        .append(entry("lost", Level::Info, None))
        .await
        .unwrap_err();
    assert!(matches!(err, runlog_state::StorageError::Backend(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn surreal_log_append_then_query() {
    let handle = SurrealHandle::in_memory().await.unwrap();
    log_append_then_query_returns_entry(&handle.log_store()).await;
}

#[tokio::test]
async fn surreal_log_query_filters() {
    let handle = SurrealHandle::in_memory().await.unwrap();
    log_query_filters_and_orders_newest_first(&handle.log_store()).await;
}

// ===========================================================================
// ArtifactStore contracts
// ===========================================================================

async fn artifact_insert_then_latest(store: &dyn ArtifactStore) {
    let key = ArtifactKey::new(1, "pr_curve");
    assert!(store.latest(&key).await.unwrap().is_none());
    assert_eq!(store.max_epoch(&key).await.unwrap(), None);

    store.insert(artifact(1, "pr_curve", 1, b"a")).await.unwrap();
    store.insert(artifact(1, "pr_curve", 3, b"c")).await.unwrap();
    store.insert(artifact(1, "pr_curve", 2, b"b")).await.unwrap();

    let latest = store.latest(&key).await.unwrap().unwrap();
    assert_eq!(latest.epoch, 3);
    assert_eq!(latest.payload, b"c");
    assert_eq!(store.max_epoch(&key).await.unwrap(), Some(3));

    let epochs: Vec<i64> = store
        .list(&key)
        .await
        .unwrap()
        .iter()
        .map(|a| a.epoch)
        .collect();
    assert_eq!(epochs, vec![1, 2, 3]);
}

async fn artifact_delete_where_is_inclusive_and_scoped(store: &dyn ArtifactStore) {
    let key = ArtifactKey::new(7, "loss");
    let other_group = ArtifactKey::new(7, "accuracy");
    let other_task = ArtifactKey::new(8, "loss");

    for epoch in 1..=4 {
        store.insert(artifact(7, "loss", epoch, b"x")).await.unwrap();
    }
    store.insert(artifact(7, "accuracy", 1, b"y")).await.unwrap();
    store.insert(artifact(8, "loss", 1, b"z")).await.unwrap();

    let removed = store.delete_where(&key, 3).await.unwrap();
    assert_eq!(removed, 3);

    let remaining: Vec<i64> = store
        .list(&key)
        .await
        .unwrap()
        .iter()
        .map(|a| a.epoch)
        .collect();
    assert_eq!(remaining, vec![4]);
    assert_eq!(store.list(&other_group).await.unwrap().len(), 1);
    assert_eq!(store.list(&other_task).await.unwrap().len(), 1);
}

async fn artifact_delete_where_on_missing_key_is_noop(store: &dyn ArtifactStore) {
    let removed = store
        .delete_where(&ArtifactKey::new(99, "nothing"), 10)
        .await
        .unwrap();
    assert_eq!(removed, 0);
}

async fn artifact_preserves_binary_payload(store: &dyn ArtifactStore) {
    let payload: Vec<u8> = (0u8..=255).collect();
    let stored = artifact(3, "confusion", 1, &payload);
    store.insert(stored.clone()).await.unwrap();

    let latest = store
        .latest(&ArtifactKey::new(3, "confusion"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.payload, payload);
    assert_eq!(latest.id, stored.id);
    assert_eq!(latest.project, 100);
    assert_eq!(latest.dag, 200);
}

#[tokio::test]
async fn memory_artifact_insert_then_latest() {
    artifact_insert_then_latest(&MemoryArtifactStore::new()).await;
}

#[tokio::test]
async fn memory_artifact_delete_where() {
    artifact_delete_where_is_inclusive_and_scoped(&MemoryArtifactStore::new()).await;
}

#[tokio::test]
async fn memory_artifact_delete_missing() {
    artifact_delete_where_on_missing_key_is_noop(&MemoryArtifactStore::new()).await;
}

#[tokio::test]
async fn memory_artifact_binary_payload() {
    artifact_preserves_binary_payload(&MemoryArtifactStore::new()).await;
}

#[tokio::test]
async fn memory_artifact_injected_failures() {
    let store = MemoryArtifactStore::new();
    store.set_fail_inserts(true);
    assert!(store.insert(artifact(1, "g", 1, b"a")).await.is_err());
    assert_eq!(store.total_rows(), 0);

    store.set_fail_inserts(false);
    store.insert(artifact(1, "g", 1, b"a")).await.unwrap();
    store.set_fail_deletes(true);
    assert!(store
        .delete_where(&ArtifactKey::new(1, "g"), 1)
        .await
        .is_err());
    assert_eq!(store.total_rows(), 1);
}

#[tokio::test]
async fn surreal_artifact_insert_then_latest() {
    let handle = SurrealHandle::in_memory().await.unwrap();
    artifact_insert_then_latest(&handle.artifact_store()).await;
}

#[tokio::test]
async fn surreal_artifact_delete_where() {
    let handle = SurrealHandle::in_memory().await.unwrap();
    artifact_delete_where_is_inclusive_and_scoped(&handle.artifact_store()).await;
}

#[tokio::test]
async fn surreal_artifact_delete_missing() {
    let handle = SurrealHandle::in_memory().await.unwrap();
    artifact_delete_where_on_missing_key_is_noop(&handle.artifact_store()).await;
}

#[tokio::test]
async fn surreal_artifact_binary_payload() {
    let handle = SurrealHandle::in_memory().await.unwrap();
    artifact_preserves_binary_payload(&handle.artifact_store()).await;
}
