//! Error handling module
//!
//! This module defines the error types and result type aliases used in the controller.
//! Startup errors are fatal, per-request errors are contained by the server and
//! shutdown errors are only logged.

use thiserror::Error;
use std::io;

/// Proxy injector error type
#[derive(Error, Debug)]
pub enum WebhookError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Key generation, signing or TLS context failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Webhook configuration could not be created, read or removed
    #[error("Registration error: {0}")]
    Registration(String),

    /// Listener bind or serve failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed admission payload or configuration JSON
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Kubernetes client initialisation error
    #[error("Kubernetes client error: {0}")]
    Kube(#[from] kube::Error),
}

impl From<openssl::error::ErrorStack> for WebhookError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        WebhookError::Crypto(err.to_string())
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::Decode(err.to_string())
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `WebhookError`.
pub type Result<T> = std::result::Result<T, WebhookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "address in use");
        let err: WebhookError = io_err.into();
        assert!(matches!(err, WebhookError::Io(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: WebhookError = json_err.into();
        assert!(matches!(err, WebhookError::Decode(_)));
    }

    #[test]
    fn test_openssl_errors_are_crypto_errors() {
        let stack = openssl::x509::X509::from_pem(b"not a certificate").unwrap_err();
        let err: WebhookError = stack.into();
        assert!(matches!(err, WebhookError::Crypto(_)));
    }

    #[test]
    fn test_error_display() {
        let err = WebhookError::Registration("webhook config is gone".to_string());
        let err_str = format!("{}", err);
        assert!(err_str.starts_with("Registration error"));
        assert!(err_str.contains("webhook config is gone"));
    }
}
