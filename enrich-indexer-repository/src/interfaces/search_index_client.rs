//! Search index client trait definition.
//!
//! This module defines the abstract interface for index writes, allowing
//! for different backend implementations (OpenSearch, mock, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchIndexError;

/// Abstract interface for search index write operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchIndexClient: Send + Sync {
    /// Create a document in the given index under a caller-supplied id.
    ///
    /// Create semantics: the write must fail with
    /// [`SearchIndexError::Conflict`] when a document with the same id
    /// already exists, never overwrite it. Implementations must also
    /// distinguish a rejected request body
    /// ([`SearchIndexError::Request`]) from other engine failures, since
    /// the caller handles each outcome differently.
    async fn create_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), SearchIndexError>;

    /// Check if the search engine is reachable and healthy.
    async fn health_check(&self) -> Result<bool, SearchIndexError>;
}
