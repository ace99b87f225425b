//! Inference endpoint client.
//!
//! The pipeline invokes one addressable inference endpoint per trained
//! model. The wire contract is fixed: a request carries the preprocessed
//! batch as `{"text": [..]}` and the response carries one structured
//! prediction per input text, order-preserving. The trait keeps the
//! transport swappable so tests run against in-process doubles.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::PipelineError;

/// One structured prediction as returned by an inference endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InferencePrediction {
    pub labels: Vec<String>,
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    predictions: Vec<InferencePrediction>,
}

/// Abstract interface for invoking an inference endpoint.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Invoke the named endpoint with one batch of texts.
    ///
    /// Implementations must return exactly one prediction per input text,
    /// in input order, or an error.
    async fn invoke(
        &self,
        endpoint: &str,
        texts: &[String],
    ) -> Result<Vec<InferencePrediction>, PipelineError>;
}

/// HTTP implementation of the inference client.
///
/// Endpoints are addressed as `<base_url>/endpoints/<name>/invocations`,
/// mirroring the serving runtime's invocation path.
pub struct HttpInferenceClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpInferenceClient {
    /// Create a client for the given serving runtime base URL.
    pub fn new(base_url: &str) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PipelineError::inference(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn invoke(
        &self,
        endpoint: &str,
        texts: &[String],
    ) -> Result<Vec<InferencePrediction>, PipelineError> {
        let url = format!("{}/endpoints/{}/invocations", self.base_url, endpoint);
        debug!(endpoint = %endpoint, batch_size = texts.len(), "Invoking inference endpoint");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "text": texts }))
            .send()
            .await
            .map_err(|e| PipelineError::inference(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::inference(format!(
                "Endpoint {} returned {}: {}",
                endpoint, status, body
            )));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::inference(format!("Invalid response body: {}", e)))?;

        if parsed.predictions.len() != texts.len() {
            return Err(PipelineError::inference(format!(
                "Endpoint {} returned {} predictions for {} texts",
                endpoint,
                parsed.predictions.len(),
                texts.len()
            )));
        }

        Ok(parsed.predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape_parses() {
        let body = r#"{
            "predictions": [
                {"labels": ["positive", "negative"], "probabilities": [0.9, 0.1]}
            ]
        }"#;
        let parsed: InferenceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.predictions.len(), 1);
        assert_eq!(parsed.predictions[0].labels, vec!["positive", "negative"]);
        assert_eq!(parsed.predictions[0].probabilities, vec![0.9, 0.1]);
    }
}
