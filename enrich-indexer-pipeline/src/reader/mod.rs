//! Record reader for the enrichment pipeline.
//!
//! Fetches a batch object from blob storage, decompresses it and decodes
//! its records. Data batches arrive as gzip-compressed newline-delimited
//! JSON; configuration objects are plain single-document JSON, so both
//! layouts are supported through the same descriptor pair.

use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use tracing::{debug, instrument, warn};

use crate::errors::PipelineError;
use enrich_indexer_repository::ObjectStorage;
use enrich_indexer_shared::RawRecord;

/// Compression applied to a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    None,
}

impl Compression {
    /// Infer the compression from the object key extension.
    pub fn from_key(key: &str) -> Self {
        if key.ends_with(".gz") {
            Self::Gzip
        } else {
            Self::None
        }
    }
}

/// Record layout of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Newline-delimited JSON, one record per line.
    Lines,
    /// A single JSON document.
    Document,
}

/// Reader that pulls record batches out of blob storage.
pub struct RecordReader {
    storage: Arc<dyn ObjectStorage>,
}

impl RecordReader {
    /// Create a new reader over the given storage.
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Read and decode one object.
    ///
    /// A line that fails to decode is logged and dropped; reading continues
    /// with the remaining lines. Only the storage fetch itself (or a corrupt
    /// archive) fails the whole read, which is fatal to the invocation.
    #[instrument(skip(self), fields(bucket = %bucket, key = %key))]
    pub async fn read(
        &self,
        bucket: &str,
        key: &str,
        compression: Compression,
        format: RecordFormat,
    ) -> Result<Vec<RawRecord>, PipelineError> {
        let bytes = self.storage.get_object(bucket, key).await?;

        let text = match compression {
            Compression::Gzip => {
                let mut decoder = GzDecoder::new(&bytes[..]);
                let mut text = String::new();
                decoder
                    .read_to_string(&mut text)
                    .map_err(|e| PipelineError::parse(format!("Gzip decode failed: {}", e)))?;
                text
            }
            Compression::None => String::from_utf8(bytes.to_vec())
                .map_err(|e| PipelineError::parse(format!("Invalid UTF-8: {}", e)))?,
        };

        let records = match format {
            RecordFormat::Lines => {
                let mut records = Vec::new();
                for line in text.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str(line) {
                        Ok(value) => records.push(RawRecord::new(value)),
                        Err(e) => {
                            warn!(error = %e, line = %line, "Dropping malformed record line");
                        }
                    }
                }
                records
            }
            RecordFormat::Document => {
                let value = serde_json::from_str(&text)
                    .map_err(|e| PipelineError::parse(format!("Invalid JSON document: {}", e)))?;
                vec![RawRecord::new(value)]
            }
        };

        debug!(record_count = records.len(), "Read records");
        Ok(records)
    }
}
