//! # Enrich Indexer Shared
//!
//! Shared types and data structures for the enrichment indexer system.
//!
//! This crate defines the data model that flows through the pipeline:
//! raw records read from blob storage, per-endpoint model configuration,
//! prediction outputs, aggregated predictions, and the enriched document
//! shape committed to the search index.

pub mod config;
pub mod document;
pub mod prediction;
pub mod record;

pub use config::{
    EndpointInfo, ModelEndpoints, PreprocessOptions, PreprocessingConfig, QuestionEndpoints,
    RunConfig, StreamConfig, DEFAULT_STANDARDIZE_FUNC_NAME,
};
pub use document::{EnrichedDocument, GeoInfo, IndexSummary};
pub use prediction::{AggregatedPrediction, CategoryPrediction, EndpointPrediction, PredictionOutput};
pub use record::RawRecord;
