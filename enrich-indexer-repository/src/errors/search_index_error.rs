//! Search index error types.
//!
//! Write failures are classified into distinct variants because the loader
//! applies a different policy to each: conflicts are expected steady-state
//! conditions, request errors are retried against a bounded budget, and
//! engine errors are counted and skipped.

use thiserror::Error;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// A document with the same id already exists in the index.
    #[error("Document conflict: {0}")]
    Conflict(String),

    /// The engine rejected the request (e.g. malformed document body).
    #[error("Request error: {0}")]
    Request(String),

    /// Any other engine-side failure.
    #[error("Engine error: {0}")]
    Engine(String),

    /// Failed to reach the search engine.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid input before any request was made.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl SearchIndexError {
    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
