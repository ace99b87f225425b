//! S3 object storage implementation.
//!
//! Built on the `object_store` crate. Credentials and region come from the
//! standard AWS environment variables; a store handle is bound to a single
//! bucket, so one is built per request from the event's bucket name.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use tracing::debug;

use crate::errors::StorageError;
use crate::interfaces::ObjectStorage;

/// S3-backed object storage.
#[derive(Debug, Default)]
pub struct S3ObjectStorage;

impl S3ObjectStorage {
    /// Create a storage handle configured from the AWS environment
    /// (`AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, ...).
    pub fn from_env() -> Self {
        Self
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| StorageError::provider(e.to_string()))?;

        let path = Path::from(key);
        let result = store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                StorageError::not_found(format!("{}/{}", bucket, key))
            }
            other => StorageError::provider(other.to_string()),
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::provider(e.to_string()))?;

        debug!(bucket = %bucket, key = %key, size = bytes.len(), "Fetched object");
        Ok(bytes)
    }
}
