//! `tracing` subscriber setup.
//!
//! Console output goes to stderr, filtered by `RUST_LOG` when set and by
//! `[logging] level` otherwise. With `[logging] file` enabled, two more
//! layers write without colour into `log_dir`, rolling over daily and
//! keeping the newest `max_files` of each:
//!
//! | File | Levels |
//! |------|--------|
//! | `tcg-printer.YYYY-MM-DD.log` | DEBUG and above |
//! | `errors.YYYY-MM-DD.log` | ERROR only |

use crate::config::LoggingConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub const LOG_FILE_PREFIX: &str = "tcg-printer";
pub const ERROR_LOG_PREFIX: &str = "errors";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Cannot create log directory {}: {source}", path.display())]
    LogDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot open {prefix} log in {}: {source}", dir.display())]
    Appender {
        dir: PathBuf,
        prefix: &'static str,
        source: InitError,
    },
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Console filter: `RUST_LOG` wins, else the configured level.
pub fn console_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn daily_appender(
    log_dir: &Path,
    prefix: &'static str,
    max_files: usize,
) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files)
        .build(log_dir)
        .map_err(|source| LoggingError::Appender {
            dir: log_dir.to_path_buf(),
            prefix,
            source,
        })
}

/// Build the subscriber without installing it.
///
/// Returns the log directory alongside when file logging is on.
pub fn build_subscriber(
    config: &LoggingConfig,
    log_dir: &Path,
) -> Result<(impl tracing::Subscriber + Send + Sync + 'static, Option<PathBuf>), LoggingError> {
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter(&config.level));

    let (detail_layer, error_layer, file_dir) = if config.file {
        std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::LogDir {
            path: log_dir.to_path_buf(),
            source,
        })?;
        let detail = tracing_subscriber::fmt::layer()
            .with_writer(daily_appender(log_dir, LOG_FILE_PREFIX, config.max_files)?)
            .with_ansi(false)
            .with_filter(LevelFilter::DEBUG);
        let errors = tracing_subscriber::fmt::layer()
            .with_writer(daily_appender(log_dir, ERROR_LOG_PREFIX, config.max_files)?)
            .with_ansi(false)
            .with_filter(LevelFilter::ERROR);
        (Some(detail), Some(errors), Some(log_dir.to_path_buf()))
    } else {
        (None, None, None)
    };

    let subscriber = tracing_subscriber::registry()
        .with(console)
        .with(detail_layer)
        .with(error_layer);
    Ok((subscriber, file_dir))
}

/// Install the global subscriber. Returns the log directory when files are written.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path) -> Result<Option<PathBuf>, LoggingError> {
    let (subscriber, file_dir) = build_subscriber(config, log_dir)?;
    subscriber
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    if let Some(dir) = &file_dir {
        tracing::debug!(dir = %dir.display(), "file logging enabled");
    }
    Ok(file_dir)
}
