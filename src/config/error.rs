//! Configuration errors
//!
//! This module defines error types for settings loading and the config bundle codec.

use std::fmt;
use std::error::Error;
use std::path::PathBuf;

/// Configuration error type
#[derive(Debug)]
pub enum ConfigError {
    /// File not found
    FileNotFound(PathBuf),

    /// Error reading file
    FileReadError(PathBuf, String),

    /// Error parsing configuration
    ParseError(String),

    /// Invalid value for configuration option
    InvalidValue(String, String),

    /// Missing required configuration value
    MissingRequiredValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) =>
                write!(f, "Configuration file not found: {}", path.display()),

            ConfigError::FileReadError(path, err) =>
                write!(f, "Error reading configuration file {}: {}", path.display(), err),

            ConfigError::ParseError(msg) =>
                write!(f, "Error parsing configuration: {}", msg),

            ConfigError::InvalidValue(name, msg) =>
                write!(f, "Invalid value for '{}': {}", name, msg),

            ConfigError::MissingRequiredValue(name) =>
                write!(f, "Missing required configuration value: {}", name),
        }
    }
}

impl Error for ConfigError {}

/// Result type alias for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::MissingRequiredValue(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

// Convert to crate's common error type
impl From<ConfigError> for crate::common::WebhookError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ParseError(msg) => crate::common::WebhookError::Decode(msg),
            other => crate::common::WebhookError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::WebhookError;

    #[test]
    fn test_conversion_into_crate_error() {
        let err: WebhookError = ConfigError::ParseError("proxy config: EOF".to_string()).into();
        assert!(matches!(err, WebhookError::Decode(_)));

        let err: WebhookError = ConfigError::FileNotFound(PathBuf::from("/etc/injector.json")).into();
        assert!(matches!(err, WebhookError::Config(ref msg) if msg.contains("/etc/injector.json")));

        let err: WebhookError =
            ConfigError::InvalidValue("addr".to_string(), "bad port".to_string()).into();
        assert!(matches!(err, WebhookError::Config(ref msg) if msg.contains("'addr'")));
    }
}
