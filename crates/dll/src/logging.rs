//! Log file setup
//!
//! Everything goes to `toolbox.log` in the data directory through a
//! non-blocking writer. The returned guard flushes the writer when dropped;
//! the worker drops it right before releasing the game API.

use std::path::Path;

use gwtb_core::{ToolboxConfig, ToolboxPaths};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Logging setup errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
}

/// Open `dir/file_name` for appending behind a background writer thread
pub fn file_writer(dir: &Path, file_name: &str) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Level filter: `debug` when enabled in config, `info` otherwise.
///
/// `RUST_LOG` is only honored with debug logging on, so a stray variable in
/// the game's environment cannot flood the log.
pub fn env_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global subscriber writing to the toolbox log file
pub fn init(config: &ToolboxConfig, paths: &ToolboxPaths) -> Result<WorkerGuard, LoggingError> {
    let log_file = paths.log_file();
    let dir = log_file.parent().unwrap_or(paths.base());
    let name = log_file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("toolbox.log");

    let (writer, guard) = file_writer(dir, name)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config.debug))
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_ids(true)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already set, keeping it");
    }
    tracing::info!("Logging to {:?}", log_file);
    Ok(guard)
}
