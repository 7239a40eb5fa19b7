//! Tracing setup: human-readable or JSON stdout, plus optional daily-rotated
//! JSON files under `LOG_DIR`.

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::Config;

const LOG_FILE_PREFIX: &str = "drowsiness-backend";
const LOG_FILES_KEPT: usize = 14;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot open log directory '{dir}': {source}")]
    LogDir {
        dir: String,
        #[source]
        source: InitError,
    },
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
///
/// A subscriber that is already installed (tests, embedding) is left in place.
pub fn init_tracing(config: &Config) -> Result<(), LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (text_stdout, json_stdout) = if config.log_json {
        (None, Some(fmt::layer().json().with_current_span(true)))
    } else {
        (Some(fmt::layer().with_target(true)), None)
    };

    let file = if config.enable_file_logs {
        let appender = daily_appender(&config.log_dir)?;
        Some(fmt::layer().with_writer(appender).with_ansi(false).json())
    } else {
        None
    };

    let installed = Registry::default()
        .with(filter)
        .with(text_stdout)
        .with(json_stdout)
        .with(file)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(
            json = config.log_json,
            file_logs = config.enable_file_logs,
            "tracing initialized"
        );
    }
    Ok(())
}

fn daily_appender(dir: &str) -> Result<RollingFileAppender, LoggingError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(LOG_FILES_KEPT)
        .build(dir)
        .map_err(|source| LoggingError::LogDir {
            dir: dir.to_string(),
            source,
        })
}
