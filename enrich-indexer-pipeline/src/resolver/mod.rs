//! Stream and run configuration resolution.
//!
//! The pipeline is configured through two kinds of objects in blob storage:
//! a fixed stream-configuration object mapping each slug to its active
//! model endpoints and index names, and one run-configuration object per
//! endpoint under a fixed key prefix. Both are fetched through the record
//! reader as single JSON documents.

use tracing::{debug, error, instrument, warn};

use crate::errors::PipelineError;
use crate::reader::{Compression, RecordFormat, RecordReader};
use enrich_indexer_shared::{RunConfig, StreamConfig};

/// Extract the slug from a storage key.
///
/// The slug is the key segment bearing the configured index prefix, with
/// the prefix stripped. Zero matches fails the invocation; several matches
/// are logged and the first is used best-effort.
pub fn extract_slug(key: &str, index_prefix: &str) -> Result<String, PipelineError> {
    let matches: Vec<&str> = key
        .split('/')
        .filter(|segment| segment.starts_with(index_prefix))
        .collect();

    match matches.as_slice() {
        [] => Err(PipelineError::config(format!(
            "No slug with prefix {} in key {}",
            index_prefix, key
        ))),
        [only] => Ok(only[index_prefix.len()..].to_string()),
        [first, ..] => {
            error!(key = %key, matches = ?matches, "Slug len != 1; using first match");
            Ok(first[index_prefix.len()..].to_string())
        }
    }
}

/// Resolver for the configuration objects kept in blob storage.
pub struct ConfigResolver {
    reader: RecordReader,
    bucket: String,
    stream_config_key: String,
    endpoints_prefix: String,
}

impl ConfigResolver {
    /// Create a resolver reading from the given configuration bucket.
    pub fn new(
        reader: RecordReader,
        bucket: impl Into<String>,
        stream_config_key: impl Into<String>,
        endpoints_prefix: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            bucket: bucket.into(),
            stream_config_key: stream_config_key.into(),
            endpoints_prefix: endpoints_prefix.into(),
        }
    }

    /// Resolve a slug to its active stream configuration.
    ///
    /// The stream-configuration object is a JSON array with one entry per
    /// slug. A slug without exactly one entry is handled like slug
    /// extraction: zero entries fail, several are logged and the first is
    /// used.
    #[instrument(skip(self))]
    pub async fn resolve(&self, slug: &str) -> Result<StreamConfig, PipelineError> {
        let records = self
            .reader
            .read(
                &self.bucket,
                &self.stream_config_key,
                Compression::None,
                RecordFormat::Document,
            )
            .await?;

        let record = records
            .first()
            .ok_or_else(|| PipelineError::config("Empty stream configuration object"))?;

        let configs: Vec<StreamConfig> = serde_json::from_value(record.value().clone())
            .map_err(|e| PipelineError::config(format!("Invalid stream configuration: {}", e)))?;

        let mut matches = configs.into_iter().filter(|c| c.slug == slug);
        let config = matches.next().ok_or_else(|| {
            PipelineError::config(format!("No stream configuration for slug {}", slug))
        })?;
        if matches.next().is_some() {
            error!(slug = %slug, "Several stream configurations for slug; using first");
        }

        Ok(config)
    }

    /// Fetch one endpoint's run configuration.
    ///
    /// Any fetch or decode failure degrades to the default configuration
    /// (empty preprocessing), so a missing object never blocks prediction.
    #[instrument(skip(self))]
    pub async fn run_config(&self, endpoint_name: &str) -> RunConfig {
        let key = format!(
            "{}/{}.json",
            self.endpoints_prefix.trim_end_matches('/'),
            endpoint_name
        );
        debug!(key = %key, "Fetching run configuration");

        let records = match self
            .reader
            .read(&self.bucket, &key, Compression::None, RecordFormat::Document)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                warn!(key = %key, error = %e, "Run configuration fetch failed; using empty config");
                return RunConfig::default();
            }
        };

        let Some(record) = records.first() else {
            return RunConfig::default();
        };

        match serde_json::from_value(record.value().clone()) {
            Ok(config) => config,
            Err(e) => {
                warn!(key = %key, error = %e, "Invalid run configuration; using empty config");
                RunConfig::default()
            }
        }
    }
}
