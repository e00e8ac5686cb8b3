//! SurrealDB Handle - Connection management
//!
//! Connects to SurrealDB (in-memory, plain URL, cloud, or local SurrealKV),
//! initializes the schema and hands out the log and artifact stores that
//! share the connection.
//!
//! ```ignore
//! let handle = SurrealHandle::from_env().await?;
//! let logs = handle.log_store();
//! let artifacts = handle.artifact_store();
//! ```

use crate::error::StateError;
use crate::migrations;
use crate::surreal_artifacts::SurrealArtifactStore;
use crate::surreal_logs::SurrealLogStore;
use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

const DEFAULT_NAMESPACE: &str = "runlog";
const DEFAULT_DATABASE: &str = "main";
const LOCAL_DB_PATH: &str = ".runlog/db";

/// Configuration for SurrealDB Cloud connection
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Namespace (default: "runlog")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Read credentials from the process environment.
    ///
    /// Reads:
    /// - SURREALDB_ENDPOINT, SURREALDB_USERNAME, SURREALDB_PASSWORD (required)
    /// - SURREALDB_NAMESPACE (default: "runlog")
    /// - SURREALDB_DATABASE (default: "main")
    /// - SURREALDB_ROOT (default: "false")
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`; fails naming the first missing
    /// required key.
    pub fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| format!("{key} not set"));

        Ok(Self {
            endpoint: required("SURREALDB_ENDPOINT")?,
            username: required("SURREALDB_USERNAME")?,
            password: required("SURREALDB_PASSWORD")?,
            namespace: lookup("SURREALDB_NAMESPACE")
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            database: lookup("SURREALDB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            is_root: lookup("SURREALDB_ROOT").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

/// Shared SurrealDB connection for the runlog stores
#[derive(Clone)]
pub struct SurrealHandle {
    db: Surreal<Any>,
}

impl SurrealHandle {
    /// Connect to an in-memory database and set up the schema.
    #[instrument(skip_all)]
    pub async fn in_memory() -> Result<Self> {
        Self::connect_url("mem://").await
    }

    /// Connect to any URL understood by `surrealdb::engine::any`
    /// (`mem://`, `surrealkv://path`, `ws://host:port`, ...).
    #[instrument]
    pub async fn connect_url(url: &str) -> Result<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {url}: {e}")))?;

        db.use_ns(DEFAULT_NAMESPACE)
            .use_db(DEFAULT_DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealDB connected ({url})");
        Ok(Self { db })
    }

    /// Connect to SurrealDB Cloud.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, namespace = %config.namespace, database = %config.database))]
    pub async fn setup_cloud(config: CloudConfig) -> Result<Self> {
        info!("Connecting to SurrealDB Cloud (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StateError::Connection(format!("Failed to connect to {}: {}", config.endpoint, e))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("SurrealDB Cloud connected and schema initialized");
        Ok(Self { db })
    }

    /// Connect using the environment.
    ///
    /// Order: cloud credentials ([`CloudConfig::from_env`]), then
    /// `SURREALDB_URL`, then local SurrealKV persistence under `.runlog/db`.
    pub async fn from_env() -> Result<Self> {
        if let Ok(config) = CloudConfig::from_env() {
            return Self::setup_cloud(config).await;
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return Self::connect_url(&url).await;
        }

        std::fs::create_dir_all(LOCAL_DB_PATH).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {LOCAL_DB_PATH}: {e}"
            ))
        })?;
        let url = format!("surrealkv://{LOCAL_DB_PATH}");
        info!("No cloud config or SURREALDB_URL found, using local persistence: {url}");
        Self::connect_url(&url).await
    }

    /// Log store sharing this connection.
    pub fn log_store(&self) -> SurrealLogStore {
        SurrealLogStore::new(self.db.clone())
    }

    /// Artifact store sharing this connection.
    pub fn artifact_store(&self) -> SurrealArtifactStore {
        SurrealArtifactStore::new(self.db.clone())
    }
}
