//! Logging setup for the TaskCraft runtime, built on `tracing` and
//! `tracing-subscriber`, with optional daily-rotating file output via
//! `tracing-appender` for long-running scheduler processes.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::schema::{LogFormat, LoggingConfig};

/// Initializes the global `tracing` subscriber from a loaded [`LoggingConfig`].
///
/// Returns a [`WorkerGuard`] that must be kept alive for the duration of the
/// process when file output is configured — dropping it flushes and stops
/// the background writer thread.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config.level);

    match &config.file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "taskcraft.log".to_string());
            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);

            match config.format {
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(file_layer.json())
                        .init();
                }
                LogFormat::Compact => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(file_layer.compact())
                        .init();
                }
                LogFormat::Pretty => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(file_layer)
                        .init();
                }
            }
            Some(guard)
        }
        None => {
            let stdout_layer = fmt::layer();
            match config.format {
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(stdout_layer.json())
                        .init();
                }
                LogFormat::Compact => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(stdout_layer.compact())
                        .init();
                }
                LogFormat::Pretty => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(stdout_layer)
                        .init();
                }
            }
            None
        }
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
