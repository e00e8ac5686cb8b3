//! SurrealDB-backed LogStore implementation

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::schema::LogRow;
use crate::storage_traits::{LogEntry, LogQuery, LogStore, StorageResult};

/// SurrealDB-backed implementation of [`LogStore`].
#[derive(Clone)]
pub struct SurrealLogStore {
    db: Surreal<Any>,
}

impl SurrealLogStore {
    pub(crate) fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Build the WHERE clause for the populated filters of `query`.
    fn where_clause(query: &LogQuery) -> String {
        let mut clauses = Vec::new();
        if query.task.is_some() {
            clauses.push("task = $task");
        }
        if query.computer.is_some() {
            clauses.push("computer = $computer");
        }
        if query.component.is_some() {
            clauses.push("component = $component");
        }
        if query.min_level.is_some() {
            clauses.push("level >= $min_level");
        }
        if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        }
    }
}

#[async_trait]
impl LogStore for SurrealLogStore {
    async fn append(&self, entry: LogEntry) -> StorageResult<()> {
        let row = LogRow::from(entry);
        debug!(component = row.component, task = ?row.task, "appending log row");

        let _created: Option<LogRow> = self.db.create("logs").content(row).await?;
        Ok(())
    }

    async fn query(&self, query: &LogQuery) -> StorageResult<Vec<LogEntry>> {
        let mut sql = format!(
            "SELECT * FROM logs{} ORDER BY timestamp DESC",
            Self::where_clause(query)
        );
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut request = self.db.query(sql);
        if let Some(task) = query.task {
            request = request.bind(("task", task));
        }
        if let Some(computer) = query.computer.clone() {
            request = request.bind(("computer", computer));
        }
        if let Some(component) = query.component {
            request = request.bind(("component", component));
        }
        if let Some(level) = query.min_level {
            request = request.bind(("min_level", level.code()));
        }

        let mut res = request.await?;
        let rows: Vec<LogRow> = res.take(0)?;
        rows.into_iter().map(LogEntry::try_from).collect()
    }
}
