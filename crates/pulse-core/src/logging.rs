//! Tracing setup.
//!
//! The TUI owns the terminal, so logs go to a daily-rolling file under
//! `$PULSE_HOME/logs`. `PULSE_LOG` takes an `EnvFilter` directive and wins
//! over `[logging] level`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, paths};

pub const LOG_ENV: &str = "PULSE_LOG";
pub const LOG_FILE_PREFIX: &str = "pulse.log";

/// Installs the global subscriber writing to `$PULSE_HOME/logs`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the writer thread.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard> {
    init_in(&paths::logs_dir(), &config.level)
}

/// Installs the global subscriber writing to `dir`.
///
/// # Errors
/// See [`init`].
pub fn init_in(dir: &Path, default_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    tracing::debug!(dir = %dir.display(), "logging initialised");
    Ok(guard)
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
