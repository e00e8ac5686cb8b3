//! Diagnostics subscriber for runlog processes.
//!
//! runlog's own faults and artifact lifecycle events (see [`crate::obs`]) are
//! tracing events, kept apart from the records a [`Logger`](crate::Logger)
//! writes. They go to stderr so they never interleave with the console
//! destination on stdout.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: `level` for runlog, with the
/// storage engine held at `warn` since it is chatty at debug.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("{level},surrealdb=warn,surrealkv=warn")
}

/// Install the process-wide diagnostics subscriber.
///
/// `json` selects newline-delimited JSON with the current span attached.
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let plain = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let structured = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .try_init()
        .is_ok()
}
