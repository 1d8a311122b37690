//! Console and rolling file logging.
//!
//! Call sites use the `log` macros; records reach the `tracing` subscriber
//! installed here, so spans opened around a diary show up on both outputs.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::error::AppError;

/// Filter used when `RUST_LOG` is unset. sqlx logs every statement at info.
pub const DEFAULT_FILTER: &str = "fizzboxd=info,sqlx=warn";

const LOG_FILE_PREFIX: &str = "fizzboxd";
const MAX_LOG_FILES: usize = 7;

/// Installs the global subscriber with a stdout layer and a daily rolling
/// file under `config.logs_path`.
///
/// Keep the returned guard alive until shutdown; dropping it flushes the
/// file writer.
pub fn setup_logging(config: &Config) -> Result<WorkerGuard, AppError> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&config.logs_path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Failed to initialize rolling file appender at '{}': {}",
                config.logs_path.to_string_lossy(),
                e
            ),
        })?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stdout).with_ansi(true))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Failed to install global subscriber: {e}"),
        })?;

    Ok(guard)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
