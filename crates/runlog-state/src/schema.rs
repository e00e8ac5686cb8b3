//! Row definitions for the runlog SurrealDB tables
//!
//! Tables:
//! - logs: one row per persisted log entry
//! - report_imgs: retained evaluation artifacts, one live series per (task, group)
//!
//! Rows convert to and from the `storage_traits` domain types at the
//! backend boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{Artifact, ArtifactId, Level, LogEntry, StorageResult};

/// Serialize chrono DateTime in SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// `logs` row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRow {
    pub message: String,
    #[serde(with = "surreal_datetime")]
    pub timestamp: DateTime<Utc>,
    /// Numeric severity code, see [`Level::code`]
    pub level: u8,
    pub component: i32,
    pub computer: Option<String>,
    pub task: Option<i64>,
    pub step: Option<i64>,
    pub module: String,
    pub line: u32,
}

impl From<LogEntry> for LogRow {
    fn from(entry: LogEntry) -> Self {
        LogRow {
            message: entry.message,
            timestamp: entry.timestamp,
            level: entry.level.code(),
            component: entry.component,
            computer: entry.computer,
            task: entry.task,
            step: entry.step,
            module: entry.module,
            line: entry.line,
        }
    }
}

impl TryFrom<LogRow> for LogEntry {
    type Error = StorageError;

    fn try_from(row: LogRow) -> StorageResult<Self> {
        Ok(LogEntry {
            message: row.message,
            timestamp: row.timestamp,
            level: Level::from_code(row.level)?,
            component: row.component,
            computer: row.computer,
            task: row.task,
            step: row.step,
            module: row.module,
            line: row.line,
        })
    }
}

/// `report_imgs` row
///
/// `group` is a SurrealQL keyword, so the column is `group_name`. The payload
/// is stored hex-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub artifact_id: String,
    pub task: i64,
    pub group_name: String,
    pub epoch: i64,
    pub project: i64,
    pub dag: i64,
    pub payload_hex: String,
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl From<Artifact> for ArtifactRow {
    fn from(artifact: Artifact) -> Self {
        ArtifactRow {
            artifact_id: artifact.id.0,
            task: artifact.task,
            group_name: artifact.group,
            epoch: artifact.epoch,
            project: artifact.project,
            dag: artifact.dag,
            payload_hex: hex::encode(&artifact.payload),
            created_at: artifact.created_at,
        }
    }
}

impl TryFrom<ArtifactRow> for Artifact {
    type Error = StorageError;

    fn try_from(row: ArtifactRow) -> StorageResult<Self> {
        let payload = hex::decode(&row.payload_hex).map_err(|e| {
            StorageError::Corrupt(format!("artifact {} payload: {e}", row.artifact_id))
        })?;
        Ok(Artifact {
            id: ArtifactId(row.artifact_id),
            task: row.task,
            group: row.group_name,
            epoch: row.epoch,
            project: row.project,
            dag: row.dag,
            payload,
            created_at: row.created_at,
        })
    }
}

/// Projection used when only epochs are needed
#[derive(Debug, Clone, Deserialize)]
pub struct EpochRow {
    pub epoch: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_row_keeps_binary_payload() {
        let artifact = Artifact {
            id: ArtifactId::new(),
            task: 1,
            group: "pr_curve".to_string(),
            epoch: 3,
            project: 10,
            dag: 20,
            payload: (0u8..=255).collect(),
            created_at: Utc::now(),
        };

        let row = ArtifactRow::from(artifact.clone());
        assert_eq!(row.group_name, "pr_curve");
        assert_eq!(Artifact::try_from(row).unwrap(), artifact);
    }

    #[test]
    fn corrupt_payload_is_reported() {
        let row = ArtifactRow {
            artifact_id: "a1".to_string(),
            task: 1,
            group_name: "g".to_string(),
            epoch: 1,
            project: 1,
            dag: 1,
            payload_hex: "zz".to_string(),
            created_at: Utc::now(),
        };

        assert!(matches!(
            Artifact::try_from(row),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn log_row_rejects_unknown_level_code() {
        let row = LogRow {
            message: "m".to_string(),
            timestamp: Utc::now(),
            level: 99,
            component: 0,
            computer: None,
            task: None,
            step: None,
            module: "m".to_string(),
            line: 1,
        };

        assert_eq!(
            LogEntry::try_from(row).unwrap_err(),
            StorageError::UnknownLevel { code: 99 }
        );
    }
}
