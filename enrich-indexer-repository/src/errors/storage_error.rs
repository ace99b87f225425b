//! Blob storage error types.

use thiserror::Error;

/// Errors that can occur when fetching objects from blob storage.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Any other provider-side failure (permissions, transport, etc.).
    #[error("Storage provider error: {0}")]
    Provider(String),
}

impl StorageError {
    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider error.
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}
