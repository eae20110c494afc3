use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("a global subscriber is already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("cannot create log directory: {0}")]
    Io(#[from] std::io::Error),
}

/// How the process wants its logs.
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or
    /// `lib_playstore=debug`.
    pub level: String,
    /// JSON lines on stderr instead of human-readable text.
    pub json: bool,
    /// Also write JSON logs to a daily rolling file under this directory.
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            log_dir: None,
            file_prefix: "playstore".to_string(),
        }
    }
}

/// Install the global subscriber.
///
/// Console output goes to stderr so stdout stays free for results. Keep the
/// returned guard alive for as long as file logs should be flushed.
pub fn init_tracing(options: &LogOptions) -> Result<Option<WorkerGuard>, LoggerError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.level)?,
    };

    let console_layer = if options.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let (file_layer, guard) = match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = rolling::daily(dir, &options.file_prefix);
            let (writer, guard) = non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::debug!(level = %options.level, json = options.json, "logging initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = LogOptions {
            level: "debug".into(),
            json: true,
            log_dir: Some(dir.path().join("logs")),
            file_prefix: "test".into(),
        };
        // Another test in this binary may own the global subscriber already.
        match init_tracing(&options) {
            Ok(guard) => assert!(guard.is_some()),
            Err(LoggerError::Init(_)) => {}
            Err(other) => panic!("unexpected {:?}", other),
        }
        assert!(dir.path().join("logs").is_dir());
    }
}
