//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for seeding the dynamic
//! configuration from multiple sources: a baseline, files, and environment
//! variables.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{ConfigError, CoordinatorDynamicConfig, DynamicConfigUpdate, WhitelistInput};

/// Configuration loader with layered approach.
///
/// Each source contributes a partial update. Later layers override earlier
/// ones field by field:
/// 1. Baseline (built-in defaults unless [`with_baseline`](Self::with_baseline) is used)
/// 2. Configuration files and strings (TOML or JSON)
/// 3. Environment variables
///
/// The stacked update is resolved against the baseline and validated once,
/// in [`load`](Self::load). Intermediate layers may disagree with each other
/// as long as the final result is consistent.
///
/// # Example
///
/// ```no_run
/// use coordinator_dynamic_config::ConfigLoader;
///
/// # fn main() -> Result<(), coordinator_dynamic_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_file("coordinator-dynamic.toml")?
///     .with_env_prefix("COORDINATOR")
///     .load()?;
///
/// println!("max segments to move: {}", config.max_segments_to_move());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    baseline: Option<CoordinatorDynamicConfig>,
    pending: DynamicConfigUpdate,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader starting from the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve layers against `baseline` instead of the built-in defaults.
    ///
    /// Typically the value currently held by the config store.
    #[must_use]
    pub fn with_baseline(mut self, baseline: CoordinatorDynamicConfig) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Layer an already-parsed update.
    #[must_use]
    pub fn with_update(mut self, update: DynamicConfigUpdate) -> Self {
        self.pending = std::mem::take(&mut self.pending).overlay(update);
        self
    }

    /// Load a partial update from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats.
    /// The file format is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let update = Self::parse_file(&content, path)?;
        debug!(path = %path.display(), "loaded dynamic config layer from file");
        Ok(self.with_update(update))
    }

    /// Load a partial update from an optional file.
    ///
    /// If the file exists, loads it. If not, silently continues.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load a partial update from a string.
    ///
    /// # Arguments
    ///
    /// * `content` - Update content as a string
    /// * `format` - Content format ("toml" or "json")
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    ///
    /// # Example
    ///
    /// ```
    /// use coordinator_dynamic_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(r#"{"maxSegmentsToMove": 12}"#, "json")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.max_segments_to_move(), 12);
    /// ```
    pub fn with_string(self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let update = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::unsupported_format(format)),
        };

        Ok(self.with_update(update))
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__FIELD_NAME`.
    /// For example, with prefix "COORDINATOR":
    /// - `COORDINATOR__MAX_SEGMENTS_TO_MOVE=20`
    /// - `COORDINATOR__KILL_DATA_SOURCE_WHITELIST=wikipedia,metrics`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file for environment variables.
    ///
    /// A missing `.env` file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::env_parse_error(".env", e.to_string())),
        }
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set), then
    /// resolves all layers against the baseline.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Environment variable parsing fails
    /// - The resolved configuration violates the kill-all/whitelist rule
    pub fn load(mut self) -> Result<CoordinatorDynamicConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        CoordinatorDynamicConfig::from_update(&self.pending, self.baseline.as_ref())
    }

    /// Return the stacked update without resolving it.
    #[must_use]
    pub fn into_update(self) -> DynamicConfigUpdate {
        self.pending
    }

    // Parse an update file based on extension
    fn parse_file(content: &str, path: &Path) -> Result<DynamicConfigUpdate, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::unsupported_format(path.display().to_string())),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let layer = env_layer(env::vars_os(), prefix)?;
        self.pending = std::mem::take(&mut self.pending).overlay(layer);
        Ok(())
    }
}

// Collect `PREFIX__FIELD` variables into an update layer.
// Keys that are not UTF-8 can never match a field and are skipped.
fn env_layer<I>(vars: I, prefix: &str) -> Result<DynamicConfigUpdate, ConfigError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let scoped = format!("{prefix}__");
    let mut layer = DynamicConfigUpdate::new();

    for (key, value) in vars {
        let Some(key) = key.to_str() else {
            continue;
        };
        if !key.starts_with(&scoped) {
            continue;
        }
        let value = value
            .to_str()
            .ok_or_else(|| ConfigError::env_parse_error(key, "value is not valid UTF-8"))?;
        apply_env_var(&mut layer, key, value, prefix)?;
    }

    Ok(layer)
}

// Apply a single environment variable to an update layer
fn apply_env_var(
    layer: &mut DynamicConfigUpdate,
    key: &str,
    value: &str,
    prefix: &str,
) -> Result<(), ConfigError> {
    let field = key
        .strip_prefix(prefix)
        .and_then(|k| k.strip_prefix("__"))
        .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

    match field {
        "MILLIS_TO_WAIT_BEFORE_DELETING" => {
            layer.millis_to_wait_before_deleting = Some(parse_number(key, value)?);
        }
        "MERGE_BYTES_LIMIT" => {
            layer.merge_bytes_limit = Some(parse_number(key, value)?);
        }
        "MERGE_SEGMENTS_LIMIT" => {
            layer.merge_segments_limit = Some(parse_number(key, value)?);
        }
        "MAX_SEGMENTS_TO_MOVE" => {
            layer.max_segments_to_move = Some(parse_number(key, value)?);
        }
        "REPLICANT_LIFETIME" => {
            layer.replicant_lifetime = Some(parse_number(key, value)?);
        }
        "REPLICATION_THROTTLE_LIMIT" => {
            layer.replication_throttle_limit = Some(parse_number(key, value)?);
        }
        "BALANCER_COMPUTE_THREADS" => {
            layer.balancer_compute_threads = Some(parse_number(key, value)?);
        }
        "MAX_SEGMENTS_IN_NODE_LOADING_QUEUE" => {
            layer.max_segments_in_node_loading_queue = Some(parse_number(key, value)?);
        }
        "EMIT_BALANCING_STATS" => {
            layer.emit_balancing_stats = Some(
                parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?,
            );
        }
        "KILL_ALL_DATA_SOURCES" => {
            layer.kill_all_data_sources = Some(
                parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?,
            );
        }
        "KILL_DATA_SOURCE_WHITELIST" => {
            layer.kill_data_source_whitelist = Some(WhitelistInput::from(value));
        }

        // Unknown key - ignore
        _ => {}
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
