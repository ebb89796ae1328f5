//! Error types for Askerbot

use thiserror::Error;

/// Main error type for Askerbot operations
#[derive(Debug, Error)]
pub enum AskerError {
    /// Configuration error (missing credentials, bad settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error on inbound input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Completion-service error (non-success status, malformed reply)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Completion service answered with no usable text
    #[error("Empty completion")]
    EmptyCompletion,

    /// Statistical index could not be read or decoded
    #[error("Index error: {0}")]
    Index(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Outbound call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Request was cancelled before the outbound call finished
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Convenient Result type using AskerError
pub type Result<T> = std::result::Result<T, AskerError>;

impl AskerError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        AskerError::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AskerError::Validation(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        AskerError::Provider(msg.into())
    }

    /// Create an index error
    pub fn index(msg: impl Into<String>) -> Self {
        AskerError::Index(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        AskerError::Timeout(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        AskerError::Cancelled(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        AskerError::Other(msg.into())
    }

    /// Whether the error came from talking to the completion service
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AskerError::Provider(_)
                | AskerError::EmptyCompletion
                | AskerError::Network(_)
                | AskerError::Timeout(_)
                | AskerError::Cancelled(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AskerError::config("OPENAI_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: OPENAI_API_KEY is not set"
        );

        let err = AskerError::timeout("answer call");
        assert_eq!(err.to_string(), "Timeout: answer call");
    }

    #[test]
    fn test_upstream_classification() {
        assert!(AskerError::provider("503").is_upstream());
        assert!(AskerError::timeout("slow").is_upstream());
        assert!(AskerError::EmptyCompletion.is_upstream());
        assert!(!AskerError::config("missing key").is_upstream());
        assert!(!AskerError::index("corrupt").is_upstream());
    }

    #[test]
    fn test_serde_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: AskerError = parse.unwrap_err().into();
        assert!(matches!(err, AskerError::Serialization(_)));
    }
}
