//! Dated run log and console output
//!
//! The library only emits `tracing` events. A process that runs the job calls
//! [`init_logging`] once with the configured [`LoggingConfig`] and keeps the
//! returned guard alive until it exits.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::types::*;

/// Parse the configured filter directive
pub fn env_filter(config: &LoggingConfig) -> SyncResult<EnvFilter> {
    EnvFilter::try_new(&config.level).map_err(|e| {
        SyncError::Config(format!("invalid log level '{}': {e}", config.level))
    })
}

/// Daily-rotated log file `<directory>/<file_prefix>.YYYY-MM-DD.log`
pub fn log_appender(config: &LoggingConfig) -> SyncResult<RollingFileAppender> {
    std::fs::create_dir_all(&config.directory).map_err(|e| {
        SyncError::Config(format!(
            "cannot create log directory {}: {e}",
            config.directory.display()
        ))
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .map_err(|e| SyncError::Config(format!("cannot open log file: {e}")))
}

/// Install the global subscriber: the dated log file plus stdout
pub fn init_logging(config: &LoggingConfig) -> SyncResult<WorkerGuard> {
    let filter = env_filter(config)?;
    let (file_writer, guard) = tracing_appender::non_blocking(log_appender(config)?);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| SyncError::Config(format!("logging already initialised: {e}")))?;

    Ok(guard)
}
