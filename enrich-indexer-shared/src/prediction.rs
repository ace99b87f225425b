//! Prediction data structures.
//!
//! One inference call yields a `PredictionOutput` per input text. Outputs
//! from every endpoint of every question category are merged into one
//! `AggregatedPrediction` per record, which is what ends up on the enriched
//! document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured prediction for one text from one inference call.
///
/// Invariant: `labels` and `probabilities` have the same length.
/// `label_vals` is only present when every label of every output in the
/// endpoint's output set converted to an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub labels: Vec<String>,
    pub probabilities: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_vals: Option<Vec<i64>>,
}

/// The winning label of one endpoint for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointPrediction {
    pub probability: f64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_val: Option<i64>,
}

/// Aggregated predictions of one question category for one record.
///
/// `primary_*` fields replicate the entry of the category's primary
/// endpoint when that endpoint produced an output for the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPrediction {
    /// Run name to the endpoint's winning label.
    #[serde(default)]
    pub endpoints: BTreeMap<String, EndpointPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_label_val: Option<i64>,
}

impl CategoryPrediction {
    /// True when no endpoint contributed and no primary fields are set.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
            && self.primary_probability.is_none()
            && self.primary_label.is_none()
            && self.primary_label_val.is_none()
    }
}

/// Per-record aggregated predictions, keyed by question tag.
///
/// The empty template (every category present with an empty
/// `CategoryPrediction`) represents "no prediction produced" and is never
/// attached to a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPrediction {
    #[serde(flatten)]
    pub categories: BTreeMap<String, CategoryPrediction>,
}

impl AggregatedPrediction {
    /// Build the empty template for the given question tags.
    pub fn template<'a>(question_tags: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            categories: question_tags
                .into_iter()
                .map(|tag| (tag.to_string(), CategoryPrediction::default()))
                .collect(),
        }
    }

    /// True when every category is empty.
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(CategoryPrediction::is_empty)
    }
}
