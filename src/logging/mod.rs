//! Logging setup
//!
//! Installs a global `tracing` subscriber: an env-filter (RUST_LOG wins over
//! the configured level), a stderr fmt layer, and an optional daily-rolling
//! file layer. The returned guard must be held until exit so buffered file
//! lines are flushed.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, registry};

use crate::config::LoggingConfig;

/// Build filter directives for the given level.
///
/// Our own crate follows the configured level; dependencies are held at warn
/// unless debug mode is on.
fn build_filter_directives(level: &str, debug: bool) -> String {
    let level = if debug { "debug" } else { level };
    let deps = if debug { "debug" } else { "warn" };
    format!("{deps},setupflow={level}")
}

/// Initialize the global subscriber.
///
/// Returns `Ok(None)` when file logging is not configured.
pub fn init(config: &LoggingConfig, debug: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(build_filter_directives(&config.level, debug)));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_ansi(cfg!(not(test)))
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match config.file.as_deref() {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "setupflow.log".to_string());

    let appender = tracing_appender::rolling::daily(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}
