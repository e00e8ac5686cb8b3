//! SurrealDB schema initialization
//!
//! Defines the `logs` and `report_imgs` tables and their indexes.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all runlog tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing runlog SurrealDB schema");

    init_logs_table(db).await?;
    init_report_imgs_table(db).await?;

    info!("runlog schema initialization complete");
    Ok(())
}

/// Initialize `logs` table
///
/// Schema:
/// ```text
/// TABLE logs {
///   message:    STRING (<= 4000 chars)
///   timestamp:  DATETIME (indexed)
///   level:      INT (10 | 20 | 30 | 40 | 50)
///   component:  INT (indexed)
///   computer:   STRING?
///   task:       INT? (indexed)
///   step:       INT?
///   module:     STRING
///   line:       INT
/// }
/// ```
///
/// Rows are append-only; nothing in runlog updates them.
async fn init_logs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing logs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS logs SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_logs_task ON TABLE logs COLUMNS task;
        DEFINE INDEX IF NOT EXISTS idx_logs_component ON TABLE logs COLUMNS component;
        DEFINE INDEX IF NOT EXISTS idx_logs_timestamp ON TABLE logs COLUMNS timestamp;
    "#;

    db.query(sql).await?.check()?;
    info!("logs table initialized");
    Ok(())
}

/// Initialize `report_imgs` table
///
/// Schema:
/// ```text
/// TABLE report_imgs {
///   artifact_id:  STRING (unique)
///   task:         INT
///   group_name:   STRING
///   epoch:        INT
///   project:      INT
///   dag:          INT
///   payload_hex:  STRING
///   created_at:   DATETIME
/// }
/// ```
///
/// `(task, group_name, epoch)` is indexed for the retention sweep and for
/// latest-epoch lookups. It is not unique: equal epochs may coexist.
async fn init_report_imgs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing report_imgs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS report_imgs SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_report_imgs_id ON TABLE report_imgs COLUMNS artifact_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_report_imgs_key_epoch ON TABLE report_imgs COLUMNS task, group_name, epoch;
    "#;

    db.query(sql).await?.check()?;
    info!("report_imgs table initialized");
    Ok(())
}
