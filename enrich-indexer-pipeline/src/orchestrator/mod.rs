//! Orchestrator module for the enrichment pipeline.
//!
//! Coordinates the consumer, reader, predictor, enricher and loader. Each
//! storage object announced by an event is one invocation: read the batch,
//! run every configured endpoint across it, then enrich and index the
//! records one at a time. A failing invocation is logged and the loop moves
//! on to the next object.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, instrument, warn};

use crate::aggregator::{CategoryPlan, EndpointPlan, PredictionAggregator};
use crate::consumer::{KafkaConsumer, ObjectRef, StreamMessage};
use crate::enricher::DocumentEnricher;
use crate::errors::PipelineError;
use crate::loader::IndexLoader;
use crate::preprocess::Preprocessor;
use crate::reader::{Compression, RecordFormat, RecordReader};
use crate::resolver::{extract_slug, ConfigResolver};
use enrich_indexer_shared::{AggregatedPrediction, IndexSummary, ModelEndpoints};

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// Prefix of the key segment bearing the slug.
    pub index_prefix: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            index_prefix: "project_".to_string(),
        }
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Manages the lifecycle of pipeline components
/// - Routes storage events into invocations
/// - Handles shutdown signals
pub struct Orchestrator {
    consumer: Arc<KafkaConsumer>,
    reader: RecordReader,
    resolver: ConfigResolver,
    aggregator: PredictionAggregator,
    enricher: DocumentEnricher,
    loader: IndexLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        consumer: KafkaConsumer,
        reader: RecordReader,
        resolver: ConfigResolver,
        aggregator: PredictionAggregator,
        enricher: DocumentEnricher,
        loader: IndexLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer: Arc::new(consumer),
            reader,
            resolver,
            aggregator,
            enricher,
            loader,
            config,
            shutdown_tx,
        }
    }

    /// Run the orchestrator.
    ///
    /// This method starts the consumer and processes storage events until a
    /// shutdown signal is received or the stream ends.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        info!("Starting enrichment indexer orchestrator");

        // Verify the search engine is reachable before consuming
        if !self.loader.health_check().await? {
            return Err(PipelineError::loader("Search engine is unhealthy"));
        }

        // Subscribe to Kafka topics
        self.consumer.subscribe()?;

        // Create message channel
        let (tx, mut rx) = mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = self.consumer.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer.run(tx, shutdown_rx).await {
                error!(error = %e, "Consumer error");
            }
        });

        // Process messages
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(StreamMessage::Events(events)) => {
                            self.process_events(events).await;
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
            }
        }

        // Wait for consumer to finish
        let _ = consumer_handle.await;

        info!("Orchestrator shutdown complete");
        Ok(())
    }

    /// Process the objects announced by one notification.
    ///
    /// Each object is one invocation; a failing invocation never blocks the
    /// following ones.
    async fn process_events(&self, events: Vec<ObjectRef>) {
        for object in events {
            if let Err(e) = self.process_object(&object).await {
                error!(
                    bucket = %object.bucket,
                    key = %object.key,
                    error = %e,
                    "Invocation failed"
                );
            }
        }
    }

    /// Run one invocation: read, predict, enrich and index one object.
    #[instrument(skip(self), fields(bucket = %object.bucket, key = %object.key))]
    pub async fn process_object(&self, object: &ObjectRef) -> Result<(), PipelineError> {
        let slug = extract_slug(&object.key, &self.config.index_prefix)?;
        let stream = self.resolver.resolve(&slug).await?;
        let index = stream
            .active_index()
            .ok_or_else(|| PipelineError::config(format!("No index configured for slug {}", slug)))?
            .to_string();

        let records = self
            .reader
            .read(
                &object.bucket,
                &object.key,
                Compression::from_key(&object.key),
                RecordFormat::Lines,
            )
            .await?;

        info!(slug = %slug, index = %index, record_count = records.len(), "Processing batch");

        if records.is_empty() {
            return Ok(());
        }

        let plans = self.build_plans(&stream.model_endpoints).await?;
        let template = AggregatedPrediction::template(plans.keys().map(String::as_str));

        let texts: Vec<String> = records.iter().map(|r| r.text().to_string()).collect();
        let predictions = self.aggregator.aggregate(&plans, &texts).await;

        let mut summary = IndexSummary::default();
        for (record, aggregated) in records.iter().zip(predictions) {
            match self.enricher.enrich(record, aggregated, &template) {
                Ok(document) => {
                    self.loader.create(&index, &document, &mut summary).await;
                }
                Err(e) => {
                    warn!(error = %e, "Skipping record");
                    summary.errors += 1;
                }
            }
        }

        self.loader.log_summary(&summary, records.len());
        Ok(())
    }

    /// Build the per-category endpoint plans from the stream configuration.
    ///
    /// Run configurations degrade to empty preprocessing on fetch failure;
    /// an unknown standardize function name fails the invocation here,
    /// before any batch is processed.
    async fn build_plans(
        &self,
        model_endpoints: &ModelEndpoints,
    ) -> Result<BTreeMap<String, CategoryPlan>, PipelineError> {
        let mut plans = BTreeMap::new();

        for (question_tag, question) in model_endpoints {
            let mut plan = CategoryPlan {
                primary: question.primary.clone(),
                endpoints: Vec::with_capacity(question.active.len()),
            };

            for (endpoint_name, info) in &question.active {
                let run_config = self.resolver.run_config(endpoint_name).await;
                let preprocessor = Preprocessor::from_config(&run_config.preprocess)?;

                plan.endpoints.push(EndpointPlan {
                    endpoint_name: endpoint_name.clone(),
                    run_name: info.run_name.clone(),
                    model_type: info.model_type.clone(),
                    preprocessor,
                });
            }

            plans.insert(question_tag.clone(), plan);
        }

        info!(
            endpoints = ?plans
                .iter()
                .map(|(tag, plan)| {
                    (
                        tag.as_str(),
                        plan.endpoints
                            .iter()
                            .map(|e| e.endpoint_name.as_str())
                            .collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>(),
            "Built endpoint plans"
        );

        Ok(plans)
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{InferenceClient, InferencePrediction};
    use crate::predictor::BatchSizeConfig;
    use async_trait::async_trait;
    use bytes::Bytes;
    use enrich_indexer_repository::{
        ObjectStorage, SearchIndexClient, SearchIndexError, StorageError,
    };
    use flate2::{write::GzEncoder, Compression as GzLevel};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    struct MemoryStorage {
        objects: HashMap<String, Bytes>,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
            self.objects
                .get(&format!("{}/{}", bucket, key))
                .cloned()
                .ok_or_else(|| StorageError::not_found(format!("{}/{}", bucket, key)))
        }
    }

    struct SentimentInference;

    #[async_trait]
    impl InferenceClient for SentimentInference {
        async fn invoke(
            &self,
            _endpoint: &str,
            texts: &[String],
        ) -> Result<Vec<InferencePrediction>, PipelineError> {
            Ok(texts
                .iter()
                .map(|text| InferencePrediction {
                    labels: vec![if text.contains("great") {
                        "positive".to_string()
                    } else {
                        "negative".to_string()
                    }],
                    probabilities: vec![0.9],
                })
                .collect())
        }
    }

    struct RecordingIndex {
        documents: Mutex<Vec<(String, String, Value)>>,
    }

    #[async_trait]
    impl SearchIndexClient for RecordingIndex {
        async fn create_document(
            &self,
            index: &str,
            id: &str,
            body: &Value,
        ) -> Result<(), SearchIndexError> {
            self.documents
                .lock()
                .unwrap()
                .push((index.to_string(), id.to_string(), body.clone()));
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, SearchIndexError> {
            Ok(true)
        }
    }

    fn gzip(data: &str) -> Bytes {
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(data.as_bytes()).unwrap();
        Bytes::from(encoder.finish().unwrap())
    }

    fn orchestrator(
        storage: Arc<MemoryStorage>,
        index: Arc<RecordingIndex>,
    ) -> Orchestrator {
        let consumer = KafkaConsumer::new("localhost:9092", "test-orchestrator").unwrap();
        Orchestrator::new(
            consumer,
            RecordReader::new(storage.clone()),
            ConfigResolver::new(
                RecordReader::new(storage),
                "config-bucket",
                "configs/stream/stream.json",
                "configs/models/",
            ),
            PredictionAggregator::new(Arc::new(SentimentInference), BatchSizeConfig::default()),
            DocumentEnricher::default(),
            IndexLoader::new(index),
            OrchestratorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_process_object_end_to_end() {
        let batch = concat!(
            "{\"id\": \"1\", \"text\": \"great day\"}\n",
            "{\"id\": \"2\", \"text\": \"bad_day\"}\n",
            "this line is broken\n",
        );
        let stream_config = r#"[
            {
                "slug": "vaccine",
                "index": ["project_vaccine_v1", "project_vaccine_v2"],
                "model_endpoints": {
                    "sentiment": {
                        "active": {
                            "ep-sent-1": {"run_name": "run1", "model_type": "fasttext"}
                        },
                        "primary": "ep-sent-1"
                    }
                }
            }
        ]"#;

        let storage = Arc::new(MemoryStorage {
            objects: HashMap::from([
                (
                    "data-stg/tweets/project_vaccine/part-0.jsonl.gz".to_string(),
                    gzip(batch),
                ),
                (
                    "config-bucket/configs/stream/stream.json".to_string(),
                    Bytes::from(stream_config),
                ),
                // No run config object: preprocessing degrades to empty.
            ]),
        });
        let index = Arc::new(RecordingIndex {
            documents: Mutex::new(Vec::new()),
        });

        let orchestrator = orchestrator(storage, index.clone());
        orchestrator
            .process_object(&ObjectRef {
                bucket: "data-stg".to_string(),
                key: "tweets/project_vaccine/part-0.jsonl.gz".to_string(),
            })
            .await
            .unwrap();

        let documents = index.documents.lock().unwrap();
        assert_eq!(documents.len(), 2);

        let (index_name, id, body) = &documents[0];
        assert_eq!(index_name, "project_vaccine_v2");
        assert_eq!(id, "1");
        assert_eq!(
            body["predictions"],
            json!({
                "sentiment": {
                    "endpoints": {
                        "run1": {"probability": 0.9, "label": "positive", "label_val": 1}
                    },
                    "primary_probability": 0.9,
                    "primary_label": "positive",
                    "primary_label_val": 1
                }
            })
        );

        let (_, id, body) = &documents[1];
        assert_eq!(id, "2");
        assert_eq!(
            body["predictions"]["sentiment"]["primary_label"],
            json!("negative")
        );
    }

    #[tokio::test]
    async fn test_missing_batch_object_fails_invocation() {
        let storage = Arc::new(MemoryStorage {
            objects: HashMap::from([(
                "config-bucket/configs/stream/stream.json".to_string(),
                Bytes::from(r#"[{"slug": "vaccine", "index": ["project_vaccine_v1"]}]"#),
            )]),
        });
        let index = Arc::new(RecordingIndex {
            documents: Mutex::new(Vec::new()),
        });

        let orchestrator = orchestrator(storage, index.clone());
        let result = orchestrator
            .process_object(&ObjectRef {
                bucket: "data-stg".to_string(),
                key: "tweets/project_vaccine/part-0.jsonl.gz".to_string(),
            })
            .await;

        assert!(matches!(result, Err(PipelineError::StorageError(_))));
        assert!(index.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_slug_fails_invocation() {
        let storage = Arc::new(MemoryStorage {
            objects: HashMap::from([(
                "config-bucket/configs/stream/stream.json".to_string(),
                Bytes::from("[]"),
            )]),
        });
        let index = Arc::new(RecordingIndex {
            documents: Mutex::new(Vec::new()),
        });

        let orchestrator = orchestrator(storage, index);
        let result = orchestrator
            .process_object(&ObjectRef {
                bucket: "data-stg".to_string(),
                key: "tweets/project_vaccine/part-0.jsonl.gz".to_string(),
            })
            .await;

        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }
}
