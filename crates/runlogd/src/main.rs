//! runlogd: supervisor process for runlog.
//!
//! Connects the store, builds the process [`Logger`] from the environment
//! (see [`LoggingConfig`]) and records its own lifecycle under the
//! supervisor component until interrupted.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use runlog_core::{log_info, ComponentType, LogContext, Logger, LoggingConfig};
use runlog_state::{LogStore, SurrealHandle};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "runlogd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Execution logging and artifact retention service", long_about = None)]
struct Cli {
    /// Enable verbose diagnostics
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted diagnostics
    #[arg(long)]
    json: bool,

    /// Use an in-memory store instead of SURREALDB_URL or the local file store
    #[arg(long)]
    in_memory: bool,
}

async fn connect(cli: &Cli) -> Result<SurrealHandle> {
    let handle = if cli.in_memory {
        SurrealHandle::in_memory().await
    } else {
        SurrealHandle::from_env().await
    };
    handle.context("Failed to connect to the runlog store")
}

async fn run(
    config: &LoggingConfig,
    store: Arc<dyn LogStore>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let logger = Logger::from_config(config, store).context("Failed to build logger")?;
    let ctx = LogContext::component(ComponentType::Supervisor);

    log_info!(
        logger,
        ctx = ctx.clone(),
        "runlogd {} started",
        env!("CARGO_PKG_VERSION")
    );
    shutdown.await;
    log_info!(logger, ctx = ctx, "runlogd stopping");

    logger.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    runlog_core::telemetry::init_tracing(cli.json, level);

    let config = LoggingConfig::from_env().context("Invalid logging configuration")?;
    let handle = connect(&cli).await?;
    let store: Arc<dyn LogStore> = Arc::new(handle.log_store());

    run(&config, store, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlog_core::Level as LogLevel;
    use runlog_state::LogQuery;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(["runlogd", "--json", "--in-memory", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.in_memory);
        assert!(cli.verbose);

        let cli = Cli::try_parse_from(["runlogd"]).unwrap();
        assert!(!cli.json && !cli.in_memory && !cli.verbose);
    }

    #[tokio::test]
    async fn records_start_and_stop_lines() {
        let dir = tempfile::tempdir().unwrap();
        let handle = SurrealHandle::in_memory().await.unwrap();
        let store = Arc::new(handle.log_store());
        let config = LoggingConfig {
            console_level: LogLevel::Critical,
            log_folder: dir.path().to_path_buf(),
            ..LoggingConfig::default()
        };

        run(&config, store.clone(), async {}).await.unwrap();

        let entries = store.query(&LogQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.component == ComponentType::Supervisor.code()));
        assert!(entries.iter().any(|e| e.message.ends_with("started")));
        assert!(entries.iter().any(|e| e.message == "runlogd stopping"));

        let file = std::fs::read_to_string(config.log_file()).unwrap();
        assert_eq!(file.lines().count(), 2);
    }
}
