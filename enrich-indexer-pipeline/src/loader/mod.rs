//! Loader module for the enrichment pipeline.
//!
//! Creates enriched documents in the search index, classifying each write
//! outcome. Conflicts are an expected steady-state condition (duplicate
//! delivery of the same record), request errors are retried against a
//! process-wide budget, and everything else is counted and skipped. No
//! single write failure ever aborts the batch.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::errors::PipelineError;
use enrich_indexer_repository::{SearchIndexClient, SearchIndexError};
use enrich_indexer_shared::{EnrichedDocument, IndexSummary};

/// Consecutive request errors tolerated before a document is dropped.
const REQUEST_ERROR_BUDGET: u32 = 5;

/// Loader that creates documents in the search index.
///
/// The request-error counter is process-wide, not per-document, and is
/// atomic so the loader stays correct if writes are ever parallelized.
pub struct IndexLoader {
    client: Arc<dyn SearchIndexClient>,
    request_errors: AtomicU32,
}

impl IndexLoader {
    /// Create a loader over the given search index client.
    pub fn new(client: Arc<dyn SearchIndexClient>) -> Self {
        Self {
            client,
            request_errors: AtomicU32::new(0),
        }
    }

    /// Create one document, updating the invocation summary.
    ///
    /// Outcomes:
    /// - success: counted as a load; resets the request-error streak
    /// - conflict: counted, logged at warn, not retried
    /// - request error: retried immediately until the process-wide budget
    ///   is exhausted, then the counter resets and the document is dropped
    /// - any other error: counted, logged, not retried
    #[instrument(skip(self, document, summary), fields(index = %index, id = %document.id))]
    pub async fn create(
        &self,
        index: &str,
        document: &EnrichedDocument,
        summary: &mut IndexSummary,
    ) {
        let body = match serde_json::to_value(document) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Failed to serialize document");
                summary.errors += 1;
                return;
            }
        };

        loop {
            match self.client.create_document(index, &document.id, &body).await {
                Ok(()) => {
                    debug!("Document created");
                    self.request_errors.store(0, Ordering::SeqCst);
                    summary.loads += 1;
                    return;
                }
                Err(SearchIndexError::Conflict(_)) => {
                    warn!("Document already exists");
                    summary.conflicts += 1;
                    return;
                }
                Err(SearchIndexError::Request(e)) => {
                    let streak = self.request_errors.fetch_add(1, Ordering::SeqCst) + 1;
                    if streak >= REQUEST_ERROR_BUDGET {
                        self.request_errors.store(0, Ordering::SeqCst);
                        error!(error = %e, streak = streak, "Request error budget exhausted; dropping document");
                        summary.errors += 1;
                        return;
                    }
                    error!(error = %e, streak = streak, "Request error; retrying");
                }
                Err(e) => {
                    error!(error = %e, "Index write failed");
                    summary.errors += 1;
                    return;
                }
            }
        }
    }

    /// Log the invocation summary once per batch.
    pub fn log_summary(&self, summary: &IndexSummary, total: usize) {
        info!(
            loads = summary.loads,
            conflicts = summary.conflicts,
            errors = summary.errors,
            total = total,
            "Loaded {}/{} to search index, already exist {}/{}",
            summary.loads,
            total,
            summary.conflicts,
            total
        );
    }

    /// Check if the search engine is healthy.
    pub async fn health_check(&self) -> Result<bool, PipelineError> {
        self.client
            .health_check()
            .await
            .map_err(|e| PipelineError::loader(e.to_string()))
    }
}
