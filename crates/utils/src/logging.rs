//! provides logging helpers

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::InitError;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::util::TryInitError;

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Log path `{0}` has no file name")]
    InvalidPath(PathBuf),

    #[error("Failed to create rolling log file: {0}")]
    Appender(#[from] InitError),

    #[error("Global subscriber already set: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Splits a log path into the directory and the file name prefix used by the appender.
fn split_log_path(log_path: &Path) -> Result<(&Path, &str), LoggingError> {
    let file = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| LoggingError::InvalidPath(log_path.to_path_buf()))?;
    let dir = log_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Ok((dir, file))
}

/// initiate the global tracing subscriber
///
/// Logs go to stderr, filtered by `RUST_LOG` (INFO by default). With a
/// `log_path` they are also written to a daily rotated file; keep the
/// returned guard alive until exit so buffered lines are flushed.
pub fn init(log_path: Option<&Path>) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    let stderr_layer = layer().with_writer(std::io::stderr).with_target(true);

    let (file_layer, file_guard) = match log_path {
        Some(log_path) => {
            let (dir, file) = split_log_path(log_path)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(file)
                .max_log_files(3)
                .build(dir)?;
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let file_layer = layer().with_writer(file_writer).with_ansi(false);
            (Some(file_layer), Some(file_guard))
        }
        None => (None, None),
    };

    registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(file_guard)
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn splits_directory_and_file() {
        let (dir, file) =
            split_log_path(Path::new("/logs/scheduler.log")).expect("path has a file name");

        assert_eq!(dir, Path::new("/logs"));
        assert_eq!(file, "scheduler.log");
    }

    #[test]
    fn bare_file_name_uses_current_directory() {
        let (dir, file) = split_log_path(Path::new("scheduler.log")).expect("path has a file name");

        assert_eq!(dir, Path::new("."));
        assert_eq!(file, "scheduler.log");
    }

    #[test]
    fn root_path_is_rejected() {
        let result = init(Some(Path::new("/")));

        assert!(matches!(result, Err(LoggingError::InvalidPath(_))));
    }
}
