//! Tracing subscriber setup for binaries embedding the runtime.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::api::{Result, RuntimeError};
use crate::config::LoggingConfig;

/// Installs the global subscriber: optional file output plus optional stderr.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| RuntimeError::Logging(format!("invalid filter {:?}: {e}", config.filter)))?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                RuntimeError::Logging(format!("cannot create {}: {e}", dir.display()))
            })?;
            let file_appender = tracing_appender::rolling::never(dir, &config.file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = config
        .stderr
        .then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| RuntimeError::Logging(e.to_string()))?;

    Ok(guard)
}
