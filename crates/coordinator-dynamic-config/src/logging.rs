//! Logging setup for processes that host the dynamic configuration.
//!
//! Every accepted, rejected, or no-op update is reported through `tracing`.
//! Accepted updates are logged at `info`, rejections at `warn`, and no-ops at
//! `debug`. This module installs a subscriber for binaries and tests that do
//! not already have one.
//!
//! # Example
//!
//! ```rust,ignore
//! use coordinator_dynamic_config::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(key = "coordinator.config", "watching dynamic config");
//! ```

use serde::Deserialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::ConfigError;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"coordinator_dynamic_config=debug"`.
    pub level: String,

    /// Emit one JSON object per event instead of human-readable lines.
    pub json_format: bool,

    /// Include source file and line.
    pub file_line_info: bool,

    /// Include the event target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug`.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            file_line_info: false,
            include_target: true,
        }
    }
}

/// Install a global subscriber according to `config`.
///
/// A disabled config installs nothing and succeeds.
///
/// # Errors
///
/// Returns [`ConfigError::LoggingInit`] if the filter is invalid or a global
/// subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let fmt_layer = if config.json_format {
        tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .try_init()
        .map_err(|e| ConfigError::LoggingInit(e.to_string()))
}

/// Parse a filter directive string.
///
/// # Errors
///
/// Returns [`ConfigError::LoggingInit`] if the directive is malformed.
pub fn create_env_filter(filter: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(filter)
        .map_err(|e| ConfigError::LoggingInit(format!("invalid log filter '{filter}': {e}")))
}
