//! Error types for nestlink

use thiserror::Error;

/// Result type alias for nestlink operations
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors raised while composing or running relation mutations.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A referenced record does not exist (connect / disconnect / delete targets).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed relation sub-document or mutation arguments.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Opaque failure reported by a storage backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid relation descriptor, model registry or configuration file.
    #[error("Config error: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl LinkError {
    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a backend error
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }
}

impl From<toml::de::Error> for LinkError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
