//! Enriched document shape committed to the search index.

use serde::{Deserialize, Serialize};

use crate::prediction::AggregatedPrediction;

/// Geo information extracted from a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl GeoInfo {
    /// True when nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.country_code.is_none()
            && self.region.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}

/// The flattened, indexable form of a raw record.
///
/// `id` is used as the index document id and is not serialized into the
/// document body. Optional fields are omitted entirely when unset, so a
/// record that received zero successful predictions is indexed with its
/// raw content intact and no `predictions` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedDocument {
    #[serde(skip_serializing)]
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_info: Option<GeoInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<AggregatedPrediction>,
}

impl EnrichedDocument {
    /// Create a document with only the required fields set.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: None,
            lang: None,
            author_id: None,
            author_handle: None,
            geo_info: None,
            predictions: None,
        }
    }
}

/// Per-invocation write counters. Logged once per batch, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Documents created successfully.
    pub loads: usize,
    /// Documents skipped because their id already existed.
    pub conflicts: usize,
    /// Documents dropped after request errors or engine failures.
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_omits_id_and_unset_fields() {
        let doc = EnrichedDocument::new("123", "great day");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({"text": "great day"}));
    }

    #[test]
    fn test_body_includes_set_fields() {
        let mut doc = EnrichedDocument::new("123", "great day");
        doc.lang = Some("en".to_string());
        doc.geo_info = Some(GeoInfo {
            country_code: Some("CH".to_string()),
            ..GeoInfo::default()
        });
        doc.predictions = Some(AggregatedPrediction::template(["sentiment"]));

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "text": "great day",
                "lang": "en",
                "geo_info": {"country_code": "CH"},
                "predictions": {"sentiment": {"endpoints": {}}}
            })
        );
    }
}
