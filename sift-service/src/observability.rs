//! Tracing initialization

use tracing_subscriber::EnvFilter;

use crate::config::QueryConfig;
use crate::error::{Error, Result};

/// Initialize JSON-formatted tracing from the configured log level
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &QueryConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("tracing init failed: {e}")))?;

    tracing::info!(log_level = %config.log_level, "Tracing initialized");

    Ok(())
}
