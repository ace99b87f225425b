//! # Enrich Indexer Repository
//!
//! This crate provides traits and implementations for the external services
//! the pipeline talks to: the search engine receiving enriched documents
//! and the blob storage holding record batches and configuration objects.
//! It includes definitions for errors, interfaces, and concrete
//! implementations for OpenSearch and S3.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod s3;

pub use errors::{SearchIndexError, StorageError};
pub use interfaces::{ObjectStorage, SearchIndexClient};
pub use opensearch::OpenSearchClient;
pub use s3::S3ObjectStorage;
