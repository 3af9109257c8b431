//! Tracing subscriber setup shared by both binaries

use crate::config::ObservabilityConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE_NAME: &str = "apod-search.log";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to open log file: {0}")]
    LogFile(#[from] InitError),

    #[error("Failed to install tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Filter used when `RUST_LOG` is unset
pub fn default_directives(log_level: &str) -> String {
    format!("apod_search={level},tower_http={level}", level = log_level)
}

/// Daily-rotated appender for `path`, keeping at most `max_files` files.
///
/// Rotated files are named `<file name>.<yyyy-mm-dd>` next to `path`.
pub fn file_appender(path: &Path, max_files: usize) -> Result<RollingFileAppender, InitError> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_LOG_FILE_NAME.to_string());

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(max_files.max(1))
        .build(dir)
}

/// Install the global subscriber: `RUST_LOG` or the configured level,
/// human-readable or JSON lines on stderr, plus the log file if configured.
///
/// File output goes through a background writer; hold the returned guard
/// until exit so buffered lines are flushed.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<Option<WorkerGuard>, TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let (file_writer, guard) = match &config.log_file {
        Some(path) => {
            let appender = file_appender(path, config.log_max_files)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };
    let file_layer = file_writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer));

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(guard)
}
