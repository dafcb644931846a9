//! Structured logging setup using `tracing-subscriber` and
//! `tracing-appender` (spec §1 "Ambient stack").
//!
//! Two modes: [`init_production`] for the long-running `run` subcommand
//! (JSON file layer with daily rotation, plus a console layer), and
//! [`init_cli`] for one-shot subcommands (console only).

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the non-blocking file-writer guard. Must be kept alive for the
/// life of the process; dropping it flushes and closes the log file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging for the long-running `run` subcommand: JSON logs to
/// `{logs_dir}/picoclaw.log.YYYY-MM-DD` (daily rotation) plus
/// human-readable output to stderr, both controlled by `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if `logs_dir` cannot be created.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .map_err(|e| anyhow::anyhow!("failed to create logs directory {}: {e}", logs_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "picoclaw.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer().json().with_writer(non_blocking);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard { _guard: guard })
}

/// Initialize console-only logging for one-shot subcommands
/// (`sessions list`, `sessions prune`).
pub fn init_cli() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).with_writer(std::io::stderr).init();
}
