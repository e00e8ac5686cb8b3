//! SurrealDB-backed ArtifactStore implementation
//!
//! Rows live in `report_imgs`; see [`crate::schema::ArtifactRow`].

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::schema::{ArtifactRow, EpochRow};
use crate::storage_traits::{Artifact, ArtifactKey, ArtifactStore, StorageResult};

/// SurrealDB-backed implementation of [`ArtifactStore`].
#[derive(Clone)]
pub struct SurrealArtifactStore {
    db: Surreal<Any>,
}

impl SurrealArtifactStore {
    pub(crate) fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    async fn select_rows(&self, key: &ArtifactKey, tail: &str) -> StorageResult<Vec<Artifact>> {
        let sql = format!(
            "SELECT * FROM report_imgs WHERE task = $task AND group_name = $group {tail}"
        );
        let mut res = self
            .db
            .query(sql)
            .bind(("task", key.task))
            .bind(("group", key.group.clone()))
            .await?;

        let rows: Vec<ArtifactRow> = res.take(0)?;
        rows.into_iter().map(Artifact::try_from).collect()
    }
}

#[async_trait]
impl ArtifactStore for SurrealArtifactStore {
    async fn insert(&self, artifact: Artifact) -> StorageResult<()> {
        debug!(
            task = artifact.task,
            group = %artifact.group,
            epoch = artifact.epoch,
            "inserting artifact row"
        );
        let row = ArtifactRow::from(artifact);
        let _created: Option<ArtifactRow> = self.db.create("report_imgs").content(row).await?;
        Ok(())
    }

    async fn delete_where(&self, key: &ArtifactKey, max_epoch: i64) -> StorageResult<usize> {
        let mut res = self
            .db
            .query(
                "DELETE report_imgs \
                 WHERE task = $task AND group_name = $group AND epoch <= $max_epoch \
                 RETURN BEFORE",
            )
            .bind(("task", key.task))
            .bind(("group", key.group.clone()))
            .bind(("max_epoch", max_epoch))
            .await?;

        let removed: Vec<EpochRow> = res.take(0)?;
        Ok(removed.len())
    }

    async fn max_epoch(&self, key: &ArtifactKey) -> StorageResult<Option<i64>> {
        let mut res = self
            .db
            .query("SELECT epoch FROM report_imgs WHERE task = $task AND group_name = $group")
            .bind(("task", key.task))
            .bind(("group", key.group.clone()))
            .await?;

        let rows: Vec<EpochRow> = res.take(0)?;
        Ok(rows.into_iter().map(|r| r.epoch).max())
    }

    async fn latest(&self, key: &ArtifactKey) -> StorageResult<Option<Artifact>> {
        let rows = self
            .select_rows(key, "ORDER BY epoch DESC, created_at DESC LIMIT 1")
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, key: &ArtifactKey) -> StorageResult<Vec<Artifact>> {
        self.select_rows(key, "ORDER BY epoch ASC").await
    }
}
