//! Structured logging setup.
//!
//! The library itself only emits `tracing` events; binaries and test harnesses
//! embedding it call [`init_logging`] once to install a subscriber. `RUST_LOG`
//! takes precedence over the configured level when set.

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy()
}

/// Install the global subscriber described by `config`.
///
/// # Errors
/// Returns `ProtocolError::ConfigError` if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let subscriber = tracing_subscriber::registry().with(env_filter(config));

    if config.json_format {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(config.ansi))
            .try_init()
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to init logging: {e}")))?;
    }

    tracing::debug!(app = %config.app_name, "Logging initialised");
    Ok(())
}
