//! Blob storage trait definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::StorageError;

/// Abstract interface for fetching objects from blob storage.
///
/// The pipeline only ever reads: record batches written by the upstream
/// delivery stream and configuration objects under fixed keys. Bucket and
/// object enumeration are out of scope.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetch the raw bytes of one object.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;
}
