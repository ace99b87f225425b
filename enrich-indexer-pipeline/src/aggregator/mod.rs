//! Multi-endpoint prediction aggregation.
//!
//! Each question category may have several active model endpoints. The
//! aggregator runs the batch predictor once per endpoint across the whole
//! record batch and merges the outputs into one `AggregatedPrediction` per
//! record, surfacing the category's primary endpoint as top-level fields.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::inference::InferenceClient;
use crate::predictor::{BatchPredictor, BatchSizeConfig};
use crate::preprocess::Preprocessor;
use enrich_indexer_shared::{AggregatedPrediction, EndpointPrediction, PredictionOutput};

/// One active endpoint of a question category, ready to invoke.
#[derive(Clone)]
pub struct EndpointPlan {
    pub endpoint_name: String,
    pub run_name: String,
    pub model_type: String,
    pub preprocessor: Preprocessor,
}

/// All active endpoints of one question category.
#[derive(Clone, Default)]
pub struct CategoryPlan {
    /// The endpoint whose output is replicated as `primary_*` fields.
    pub primary: Option<String>,
    pub endpoints: Vec<EndpointPlan>,
}

/// Aggregator that merges per-endpoint predictions per record.
pub struct PredictionAggregator {
    predictor: BatchPredictor,
    batch_sizes: BatchSizeConfig,
}

impl PredictionAggregator {
    /// Create an aggregator over the given inference client.
    pub fn new(inference: Arc<dyn InferenceClient>, batch_sizes: BatchSizeConfig) -> Self {
        Self {
            predictor: BatchPredictor::new(inference),
            batch_sizes,
        }
    }

    /// Run every planned endpoint across the record batch and merge the
    /// outputs, one `AggregatedPrediction` per input text.
    ///
    /// An endpoint whose output is null for a record contributes nothing to
    /// that record: neither an `endpoints` entry nor, for the primary
    /// endpoint, the `primary_*` fields.
    #[instrument(skip(self, plans, texts), fields(category_count = plans.len(), text_count = texts.len()))]
    pub async fn aggregate(
        &self,
        plans: &BTreeMap<String, CategoryPlan>,
        texts: &[String],
    ) -> Vec<AggregatedPrediction> {
        let template = AggregatedPrediction::template(plans.keys().map(String::as_str));
        let mut predictions = vec![template; texts.len()];

        for (question_tag, plan) in plans {
            for endpoint in &plan.endpoints {
                let batch_size = self.batch_sizes.for_model_type(&endpoint.model_type);
                let outputs = self
                    .predictor
                    .predict(
                        &endpoint.endpoint_name,
                        &endpoint.preprocessor,
                        texts,
                        batch_size,
                    )
                    .await;

                let is_primary = plan.primary.as_deref() == Some(endpoint.endpoint_name.as_str());

                for (prediction, output) in predictions.iter_mut().zip(&outputs) {
                    let Some(output) = output else { continue };
                    let Some(winner) = winning_prediction(output) else {
                        debug!(
                            endpoint = %endpoint.endpoint_name,
                            "Output without probabilities; skipping"
                        );
                        continue;
                    };

                    // The template carries every planned category.
                    let Some(category) = prediction.categories.get_mut(question_tag) else {
                        continue;
                    };

                    if is_primary {
                        category.primary_probability = Some(winner.probability);
                        category.primary_label = Some(winner.label.clone());
                        category.primary_label_val = winner.label_val;
                    }
                    category
                        .endpoints
                        .insert(endpoint.run_name.clone(), winner);
                }
            }
        }

        predictions
    }
}

/// The winning label of one output: highest probability, first index on a
/// tie, with the matching numeric label value when present.
fn winning_prediction(output: &PredictionOutput) -> Option<EndpointPrediction> {
    let mut best = 0;
    let mut max_prob = *output.probabilities.first()?;
    for (i, &prob) in output.probabilities.iter().enumerate().skip(1) {
        if prob > max_prob {
            max_prob = prob;
            best = i;
        }
    }

    Some(EndpointPrediction {
        probability: max_prob,
        label: output.labels.get(best)?.clone(),
        label_val: output
            .label_vals
            .as_ref()
            .and_then(|vals| vals.get(best).copied()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;
    use crate::inference::InferencePrediction;
    use async_trait::async_trait;
    use enrich_indexer_shared::PreprocessingConfig;
    use serde_json::json;
    use std::collections::HashMap;

    /// Inference double keyed by endpoint name. Endpoints not in the map
    /// fail every call.
    struct MappedInference {
        responses: HashMap<String, Vec<InferencePrediction>>,
    }

    #[async_trait]
    impl InferenceClient for MappedInference {
        async fn invoke(
            &self,
            endpoint: &str,
            texts: &[String],
        ) -> Result<Vec<InferencePrediction>, PipelineError> {
            match self.responses.get(endpoint) {
                Some(predictions) => Ok(predictions[..texts.len()].to_vec()),
                None => Err(PipelineError::inference("model error")),
            }
        }
    }

    fn plan(endpoint_name: &str, run_name: &str) -> EndpointPlan {
        EndpointPlan {
            endpoint_name: endpoint_name.to_string(),
            run_name: run_name.to_string(),
            model_type: "fasttext".to_string(),
            preprocessor: Preprocessor::from_config(&PreprocessingConfig::default()).unwrap(),
        }
    }

    fn prediction(labels: &[&str], probabilities: &[f64]) -> InferencePrediction {
        InferencePrediction {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            probabilities: probabilities.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_example() {
        let inference = Arc::new(MappedInference {
            responses: HashMap::from([(
                "ep-sent-1".to_string(),
                vec![
                    prediction(&["positive"], &[0.9]),
                    prediction(&["negative"], &[0.8]),
                ],
            )]),
        });
        let aggregator = PredictionAggregator::new(inference, BatchSizeConfig::default());

        let plans = BTreeMap::from([(
            "sentiment".to_string(),
            CategoryPlan {
                primary: Some("ep-sent-1".to_string()),
                endpoints: vec![plan("ep-sent-1", "run1")],
            },
        )]);
        let texts = vec!["great day".to_string(), "bad_day".to_string()];

        let predictions = aggregator.aggregate(&plans, &texts).await;

        assert_eq!(predictions.len(), 2);
        assert_eq!(
            serde_json::to_value(&predictions[0]).unwrap(),
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
        assert_eq!(
            predictions[1].categories["sentiment"].primary_label.as_deref(),
            Some("negative")
        );
        assert_eq!(
            predictions[1].categories["sentiment"].primary_label_val,
            Some(-1)
        );
    }

    #[tokio::test]
    async fn test_primary_matches_endpoints_entry() {
        let inference = Arc::new(MappedInference {
            responses: HashMap::from([
                (
                    "ep-a".to_string(),
                    vec![prediction(&["positive", "negative"], &[0.3, 0.7])],
                ),
                (
                    "ep-b".to_string(),
                    vec![prediction(&["positive", "negative"], &[0.6, 0.4])],
                ),
            ]),
        });
        let aggregator = PredictionAggregator::new(inference, BatchSizeConfig::default());

        let plans = BTreeMap::from([(
            "sentiment".to_string(),
            CategoryPlan {
                primary: Some("ep-a".to_string()),
                endpoints: vec![plan("ep-a", "run-a"), plan("ep-b", "run-b")],
            },
        )]);

        let predictions = aggregator
            .aggregate(&plans, &["some text".to_string()])
            .await;

        let category = &predictions[0].categories["sentiment"];
        assert_eq!(category.endpoints.len(), 2);

        let primary_entry = &category.endpoints["run-a"];
        assert_eq!(category.primary_probability, Some(primary_entry.probability));
        assert_eq!(category.primary_label.as_deref(), Some("negative"));
        assert_eq!(category.primary_label_val, primary_entry.label_val);
    }

    #[tokio::test]
    async fn test_failed_endpoint_contributes_nothing() {
        let inference = Arc::new(MappedInference {
            responses: HashMap::new(),
        });
        let aggregator = PredictionAggregator::new(inference, BatchSizeConfig::default());

        let plans = BTreeMap::from([(
            "sentiment".to_string(),
            CategoryPlan {
                primary: Some("ep-sent-1".to_string()),
                endpoints: vec![plan("ep-sent-1", "run1")],
            },
        )]);

        let predictions = aggregator
            .aggregate(&plans, &["some text".to_string()])
            .await;

        // The primary endpoint failed, so the record has the empty template.
        assert_eq!(
            predictions[0],
            AggregatedPrediction::template(["sentiment"])
        );
        assert!(predictions[0].is_empty());
    }

    #[test]
    fn test_argmax_first_index_tie_break() {
        let output = PredictionOutput {
            labels: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            probabilities: vec![0.4, 0.4, 0.2],
            label_vals: None,
        };
        let winner = winning_prediction(&output).unwrap();
        assert_eq!(winner.label, "a");
        assert_eq!(winner.probability, 0.4);
        assert_eq!(winner.label_val, None);
    }

    #[test]
    fn test_empty_probabilities_yield_nothing() {
        let output = PredictionOutput {
            labels: vec![],
            probabilities: vec![],
            label_vals: None,
        };
        assert!(winning_prediction(&output).is_none());
    }
}
