//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::errors::{SeedKeepError, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging
///
/// `RUST_LOG` wins over the configured level. Calling this twice is harmless,
/// the second subscriber is simply not installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| SeedKeepError::ConfigError(format!("Invalid log level: {}", e)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format.as_str() {
        "json" => registry.with(fmt::layer().json()).try_init(),
        _ => registry.with(fmt::layer()).try_init(),
    };

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
    Ok(())
}
