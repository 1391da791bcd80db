//! Configuration error types

use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file contains invalid TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration is structurally valid but semantically wrong
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a validation error
    #[inline]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
