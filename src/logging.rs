use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use crate::config::{LogFormat, StudioConfig};

/// Initialize tracing with a stdout layer and an optional rolling file layer.
///
/// - Stdout: compact human-readable, or JSON when `log_format = "json"`
/// - File: daily-rolling `studio.log` under `log_dir`, always JSON
/// - Default level: INFO (debug for this crate), override via RUST_LOG env
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init(config: &StudioConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,component_studio=debug,studio_lib=debug"));

    let stdout_layer = match config.log_format {
        LogFormat::Compact => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .compact()
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "studio.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    tracing::debug!("Tracing initialized");
    guard
}
