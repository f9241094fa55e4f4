//! Tracing subscriber setup.

use localvol_shared::errors::{LocalvolError, LocalvolResult};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use super::options::LogOptions;

/// Log file name prefix inside [`LogOptions::dir`].
pub const LOG_FILE_PREFIX: &str = "localvol.log";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `options.level`. With a log directory
/// configured, output goes to a daily-rolling file through a non-blocking
/// writer; the returned guard must be kept alive to flush it. Otherwise
/// logs go to stderr, leaving stdout to the protocol.
pub fn init_logging(options: &LogOptions) -> LocalvolResult<Option<WorkerGuard>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), &options.level)?;

    let Some(dir) = &options.dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| LocalvolError::Config(format!("failed to init logging: {}", e)))?;
        return Ok(None);
    };

    std::fs::create_dir_all(dir).map_err(|e| {
        LocalvolError::Config(format!(
            "cannot create log directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| LocalvolError::Config(format!("failed to init logging: {}", e)))?;

    Ok(Some(guard))
}

/// A usable `rust_log` wins; otherwise `level` must parse.
fn build_filter(rust_log: Option<&str>, level: &str) -> LocalvolResult<EnvFilter> {
    if let Some(filter) = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| LocalvolError::Config(format!("invalid log level '{}': {}", level, e)))
}
