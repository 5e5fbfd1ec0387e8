//! Configuration error types.

use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while constructing or loading a dynamic configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `killAllDataSources` was enabled together with a non-empty whitelist.
    ///
    /// No configuration is produced; the previously active one stays in effect.
    #[error(
        "can't have killAllDataSources and non-empty killDataSourceWhitelist (whitelist: {whitelist:?})"
    )]
    KillAllWithWhitelist {
        /// The whitelist that conflicted with the kill-all switch.
        whitelist: BTreeSet<String>,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration format or file extension.
    #[error("unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The format name or file path that could not be handled.
        format: String,
    },

    /// Environment variable parsing error.
    #[error("failed to parse environment variable {var}: {reason}")]
    EnvParseError {
        /// The environment variable name.
        var: String,
        /// Explanation of the parsing error.
        reason: String,
    },

    /// Failed to install the logging subscriber.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

impl ConfigError {
    /// Create a new kill-all/whitelist conflict error.
    pub fn kill_all_with_whitelist(whitelist: BTreeSet<String>) -> Self {
        Self::KillAllWithWhitelist { whitelist }
    }

    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Create a new unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create a new environment variable parse error.
    pub fn env_parse_error(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error is a rejected configuration rather than an I/O or parse failure.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::KillAllWithWhitelist { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_all_with_whitelist_error() {
        let whitelist: BTreeSet<String> = ["ds1".to_string()].into_iter().collect();
        let err = ConfigError::kill_all_with_whitelist(whitelist);
        assert!(err.to_string().contains("killAllDataSources"));
        assert!(err.to_string().contains("ds1"));
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_file_not_found_error() {
        let err = ConfigError::file_not_found("/path/to/coordinator.toml");
        assert!(err.to_string().contains("/path/to/coordinator.toml"));
        assert!(!err.is_invariant_violation());
    }

    #[test]
    fn test_unsupported_format_error() {
        let err = ConfigError::unsupported_format("yaml");
        assert!(err.to_string().contains("yaml"));
    }

    #[test]
    fn test_env_parse_error() {
        let err = ConfigError::env_parse_error("COORD__MAX_SEGMENTS_TO_MOVE", "expected integer");
        assert!(err.to_string().contains("COORD__MAX_SEGMENTS_TO_MOVE"));
        assert!(err.to_string().contains("expected integer"));
    }
}
