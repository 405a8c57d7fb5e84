//! Tracing initialization
//!
//! Logs always go to stderr; stdout carries the end-of-run summary.

use anyhow::{anyhow, Result};
use merchload_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Pick the filter: `--log-level`, else `RUST_LOG`, else the configured level
fn env_filter(config: &LoggingConfig, log_level: Option<&str>) -> EnvFilter {
    if let Some(level) = log_level {
        return EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'info'", level);
            EnvFilter::new("info")
        });
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

pub fn init_tracing(config: &LoggingConfig, log_level: Option<&str>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config, log_level))
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
