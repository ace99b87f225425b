//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchIndexClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    CreateParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexClient;

/// OpenSearch client implementation.
///
/// Performs create-only document writes so that duplicate deliveries of the
/// same record surface as conflicts instead of silently overwriting the
/// previously indexed document.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200")?;
/// client
///     .create_document("project_vaccine_v2", "12345", &body)
///     .await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub fn new(url: &str) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }
}

#[async_trait]
impl SearchIndexClient for OpenSearchClient {
    /// Create a document, classifying the failure mode.
    ///
    /// HTTP 409 maps to `Conflict` (id already present), HTTP 400 to
    /// `Request` (rejected body), any other non-success status to `Engine`,
    /// and a transport failure to `Connection`.
    async fn create_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), SearchIndexError> {
        if id.is_empty() {
            return Err(SearchIndexError::validation("empty document id"));
        }

        let response = self
            .client
            .create(CreateParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            debug!(index = %index, id = %id, "Document created");
            return Ok(());
        }

        match status.as_u16() {
            409 => Err(SearchIndexError::conflict(format!(
                "index={}, id={}",
                index, id
            ))),
            400 => {
                let error_body = response.text().await.unwrap_or_default();
                error!(index = %index, id = %id, body = %error_body, "Create request rejected");
                Err(SearchIndexError::request(error_body))
            }
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                error!(index = %index, id = %id, status = %status, body = %error_body, "Create failed");
                Err(SearchIndexError::engine(format!(
                    "status {}: {}",
                    status, error_body
                )))
            }
        }
    }

    async fn health_check(&self) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }
}
