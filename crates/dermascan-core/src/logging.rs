//! tracing subscriber setup.
//!
//! Filter resolution: `DERMASCAN_LOG` env var, then `log.level` from
//! config, then `warn`. Logs go to stderr unless `log.file` is set.

use std::env;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogSettings;

pub const LOG_ENV: &str = "DERMASCAN_LOG";

/// Keeps the non-blocking file writer alive; drop it last.
#[must_use]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Builds the filter from the environment or the configured level.
pub fn filter(settings: &LogSettings) -> EnvFilter {
    resolve_filter(env::var(LOG_ENV).ok().as_deref(), settings)
}

fn resolve_filter(from_env: Option<&str>, settings: &LogSettings) -> EnvFilter {
    [from_env, Some(settings.level.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .find_map(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init(settings: &LogSettings) -> Result<LogGuard> {
    let filter = filter(settings);

    match settings.file.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {file}"))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {e}"))?;
            Ok(LogGuard {
                _worker: Some(worker),
            })
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init()
                .map_err(|e| anyhow!("Failed to install logger: {e}"))?;
            Ok(LogGuard { _worker: None })
        }
    }
}
