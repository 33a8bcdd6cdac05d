use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "pipeline.log";

/// Initializes the logging system with both console and file output.
///
/// `RUST_LOG` wins over `config.default_filter` when set.
pub fn init_logging(config: &LoggingConfig) {
    let _ = fs::create_dir_all(&config.dir);

    // Daily-rotated JSON log next to the human-readable console output
    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the writer guard alive for the whole process so buffered lines get flushed
    std::mem::forget(_guard);
}
