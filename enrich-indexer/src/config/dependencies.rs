//! Dependency initialization and wiring for the enrichment indexer.
//!
//! All network clients are constructed once here and handed to the
//! components that need them, so tests can substitute in-process doubles
//! behind the same traits.

use std::env;
use std::sync::Arc;

use tracing::info;

use crate::IndexingError;
use enrich_indexer_pipeline::{
    aggregator::PredictionAggregator,
    consumer::KafkaConsumer,
    enricher::DocumentEnricher,
    inference::HttpInferenceClient,
    loader::IndexLoader,
    orchestrator::{Orchestrator, OrchestratorConfig},
    predictor::BatchSizeConfig,
    reader::RecordReader,
    resolver::ConfigResolver,
};
use enrich_indexer_repository::{ObjectStorage, OpenSearchClient, S3ObjectStorage, SearchIndexClient};

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "enrich-indexer";

/// Default inference serving runtime base URL.
const DEFAULT_INFERENCE_URL: &str = "http://localhost:8080";

/// Default bucket holding the configuration objects.
const DEFAULT_CONFIG_BUCKET: &str = "enrich-indexer-stg";

/// Default key of the stream configuration object.
const DEFAULT_STREAM_CONFIG_KEY: &str = "configs/stream/stream.json";

/// Default key prefix of the per-endpoint run configurations.
const DEFAULT_ENDPOINTS_PREFIX: &str = "configs/models/";

/// Default prefix of the key segment bearing the slug.
const DEFAULT_INDEX_PREFIX: &str = "project_";

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: enrich-indexer)
    /// - `INFERENCE_URL`: Inference runtime base URL (default: http://localhost:8080)
    /// - `CONFIG_BUCKET`: Bucket holding configuration objects
    /// - `STREAM_CONFIG_KEY`: Key of the stream configuration object
    /// - `ENDPOINTS_PREFIX`: Key prefix of per-endpoint run configurations
    /// - `INDEX_PREFIX`: Prefix of the key segment bearing the slug
    /// - `BATCH_SIZE_DEFAULT`: Inference batch size for unknown model types (default: 1)
    /// - `BATCH_SIZE_FASTTEXT`: Inference batch size for fasttext models (default: 100)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexingError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let kafka_broker =
            env::var("KAFKA_BROKER").unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string());
        let inference_url =
            env::var("INFERENCE_URL").unwrap_or_else(|_| DEFAULT_INFERENCE_URL.to_string());
        let config_bucket =
            env::var("CONFIG_BUCKET").unwrap_or_else(|_| DEFAULT_CONFIG_BUCKET.to_string());
        let stream_config_key = env::var("STREAM_CONFIG_KEY")
            .unwrap_or_else(|_| DEFAULT_STREAM_CONFIG_KEY.to_string());
        let endpoints_prefix =
            env::var("ENDPOINTS_PREFIX").unwrap_or_else(|_| DEFAULT_ENDPOINTS_PREFIX.to_string());
        let index_prefix =
            env::var("INDEX_PREFIX").unwrap_or_else(|_| DEFAULT_INDEX_PREFIX.to_string());

        let batch_sizes = BatchSizeConfig {
            default: env_usize("BATCH_SIZE_DEFAULT", BatchSizeConfig::default().default)?,
            fasttext: env_usize("BATCH_SIZE_FASTTEXT", BatchSizeConfig::default().fasttext)?,
        };

        info!(
            opensearch_url = %opensearch_url,
            kafka_broker = %kafka_broker,
            kafka_group_id = %kafka_group_id,
            inference_url = %inference_url,
            config_bucket = %config_bucket,
            "Initializing dependencies"
        );

        // Initialize OpenSearch client
        let search_client = Arc::new(OpenSearchClient::new(&opensearch_url).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
        })?);

        // Verify OpenSearch is reachable
        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        // Initialize blob storage and the inference client
        let storage: Arc<dyn ObjectStorage> = Arc::new(S3ObjectStorage::from_env());
        let inference = Arc::new(HttpInferenceClient::new(&inference_url).map_err(|e| {
            IndexingError::config(format!("Failed to create inference client: {}", e))
        })?);

        // Initialize Kafka consumer
        let consumer = KafkaConsumer::new(&kafka_broker, &kafka_group_id)
            .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        // Wire the pipeline components
        let reader = RecordReader::new(storage.clone());
        let resolver = ConfigResolver::new(
            RecordReader::new(storage),
            config_bucket,
            stream_config_key,
            endpoints_prefix,
        );
        let aggregator = PredictionAggregator::new(inference, batch_sizes);
        let enricher = DocumentEnricher::default();
        let loader = IndexLoader::new(search_client);

        let orchestrator = Orchestrator::new(
            consumer,
            reader,
            resolver,
            aggregator,
            enricher,
            loader,
            OrchestratorConfig {
                index_prefix,
                ..OrchestratorConfig::default()
            },
        );

        Ok(Self { orchestrator })
    }
}

/// Read a usize environment variable with a default.
fn env_usize(name: &str, default: usize) -> Result<usize, IndexingError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| IndexingError::config(format!("Invalid {}: {}", name, value))),
        Err(_) => Ok(default),
    }
}
