//! Structured logging setup.
//!
//! Installs a global `tracing-subscriber` fmt subscriber configured from
//! [`LoggingConfig`]. `RUST_LOG` directives take precedence over the
//! configured level.

use crate::config::LoggingConfig;
use crate::error::{CourierError, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// # Errors
/// Returns `CourierError::ConfigError` if the log file cannot be opened or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();

    let file = match (config.log_to_file, &config.log_file_path) {
        (true, Some(path)) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CourierError::ConfigError(format!("Failed to open log file: {e}")))?,
        ),
        _ => None,
    };

    let to_file = file.is_some();
    let writer = match (config.log_to_console, file) {
        (true, Some(file)) => BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))),
        (false, Some(file)) => BoxMakeWriter::new(Mutex::new(file)),
        (_, None) => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!to_file);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| CourierError::ConfigError(format!("Failed to install logger: {e}")))?;
    tracing::debug!(app = %config.app_name, "Logging initialized");
    Ok(())
}
