use crate::config::LoggingConfig;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging with a JSON file layer and a console layer on stderr.
///
/// `RUST_LOG` takes precedence; otherwise the configured level applies to
/// this crate. The returned guard must be held until exit so buffered file
/// output is flushed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<WorkerGuard> {
    fs::create_dir_all(&config.dir)?;

    // Create a non-blocking file appender for daily log rotation
    let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stderr);

    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::new(format!(
            "disaster_etl={level},process_data={level}",
            level = config.level
        )),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(guard)
}
