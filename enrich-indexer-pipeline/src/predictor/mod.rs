//! Batched prediction against one inference endpoint.
//!
//! Texts are partitioned into contiguous batches, preprocessed and sent to
//! the endpoint one batch at a time. A failing batch null-fills exactly its
//! own slots so the remaining batches still run; a record with a null slot
//! simply lacks that endpoint's signal downstream.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use crate::inference::InferenceClient;
use crate::preprocess::Preprocessor;
use enrich_indexer_shared::PredictionOutput;

/// Inference batch sizes keyed by model type.
#[derive(Debug, Clone, Copy)]
pub struct BatchSizeConfig {
    /// Batch size for unknown model types.
    pub default: usize,
    /// Batch size for fasttext models.
    pub fasttext: usize,
}

impl Default for BatchSizeConfig {
    fn default() -> Self {
        Self {
            default: 1,
            fasttext: 100,
        }
    }
}

impl BatchSizeConfig {
    /// The batch size for a model type. Unknown types are logged and fall
    /// back to the default size.
    pub fn for_model_type(&self, model_type: &str) -> usize {
        if model_type == "fasttext" {
            return self.fasttext;
        }
        warn!(model_type = %model_type, "Model type unknown. Using default batch size");
        self.default
    }
}

/// Convert label tags to numeric values.
///
/// The fixed sentiment tags map directly; any other tag is split on `_` and
/// its leading segment parsed as an integer ("1_worried" -> 1). Returns
/// `None` as soon as any label fails to parse.
pub fn labels_to_int(labels: &[String]) -> Option<Vec<i64>> {
    let mut label_vals = Vec::with_capacity(labels.len());
    for label in labels {
        let val = match label.as_str() {
            "positive" => 1,
            "negative" => -1,
            "neutral" => 0,
            other => other.split('_').next()?.parse().ok()?,
        };
        label_vals.push(val);
    }
    Some(label_vals)
}

/// Predictor that runs one endpoint over a record batch.
pub struct BatchPredictor {
    inference: Arc<dyn InferenceClient>,
}

impl BatchPredictor {
    /// Create a predictor over the given inference client.
    pub fn new(inference: Arc<dyn InferenceClient>) -> Self {
        Self { inference }
    }

    /// Run prediction in batches of `batch_size`.
    ///
    /// Returns exactly one slot per input text, in input order. A slot is
    /// `None` when its batch's inference call failed. `label_vals` is
    /// derived after all batches under an all-or-nothing rule: if any label
    /// of any non-null output fails to convert, the field is omitted for
    /// the endpoint's entire output set.
    #[instrument(skip(self, preprocessor, texts), fields(endpoint = %endpoint, text_count = texts.len()))]
    pub async fn predict(
        &self,
        endpoint: &str,
        preprocessor: &Preprocessor,
        texts: &[String],
        batch_size: usize,
    ) -> Vec<Option<PredictionOutput>> {
        let mut outputs: Vec<Option<PredictionOutput>> = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size.max(1)) {
            let prepared = preprocessor.apply(batch);
            debug!(batch_size = prepared.len(), "Invoking batch");

            match self.inference.invoke(endpoint, &prepared).await {
                Ok(predictions) if predictions.len() == batch.len() => {
                    outputs.extend(predictions.into_iter().map(|pred| {
                        Some(PredictionOutput {
                            labels: pred.labels,
                            probabilities: pred.probabilities,
                            label_vals: None,
                        })
                    }));
                }
                Ok(predictions) => {
                    error!(
                        endpoint = %endpoint,
                        expected = batch.len(),
                        received = predictions.len(),
                        "Prediction count mismatch; treating batch as failed"
                    );
                    outputs.extend(std::iter::repeat_with(|| None).take(batch.len()));
                }
                Err(e) => {
                    error!(endpoint = %endpoint, error = %e, "Inference call failed for batch");
                    outputs.extend(std::iter::repeat_with(|| None).take(batch.len()));
                }
            }
        }

        attach_label_vals(&mut outputs);
        outputs
    }
}

/// Derive `label_vals` for every non-null output, all-or-nothing across the
/// endpoint's whole output set.
fn attach_label_vals(outputs: &mut [Option<PredictionOutput>]) {
    let mut converted = Vec::with_capacity(outputs.len());
    for output in outputs.iter().flatten() {
        match labels_to_int(&output.labels) {
            Some(vals) => converted.push(vals),
            None => return,
        }
    }

    let mut converted = converted.into_iter();
    for output in outputs.iter_mut().flatten() {
        output.label_vals = converted.next();
    }
}
