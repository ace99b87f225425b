//! Document enrichment.
//!
//! Flattens a raw record into its indexable shape and attaches the
//! aggregated predictions when any endpoint produced one. A record whose
//! predictions equal the empty template is still indexed, just without a
//! `predictions` field, so inference failures never cost the raw content.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use tracing::debug;

use crate::errors::PipelineError;
use crate::preprocess::standardize;
use enrich_indexer_shared::{AggregatedPrediction, EnrichedDocument, GeoInfo, RawRecord};

/// Resolver of free-form location strings to geo information.
///
/// Geocoding internals are an external collaborator; the default
/// implementation resolves nothing.
pub trait Geocoder: Send + Sync {
    fn resolve(&self, location: &str) -> Option<GeoInfo>;
}

/// Geocoder that never resolves anything.
#[derive(Debug, Default)]
pub struct NoopGeocoder;

impl Geocoder for NoopGeocoder {
    fn resolve(&self, _location: &str) -> Option<GeoInfo> {
        None
    }
}

/// Enricher that turns raw records into indexable documents.
pub struct DocumentEnricher {
    geocoder: Arc<dyn Geocoder>,
}

impl DocumentEnricher {
    /// Create an enricher with the given geocoder.
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Flatten one record and merge its aggregated predictions.
    ///
    /// The `predictions` field is attached only when `aggregated` differs
    /// from the empty `template`. Fails when the record carries no id,
    /// since the id doubles as the index document id.
    pub fn enrich(
        &self,
        record: &RawRecord,
        aggregated: AggregatedPrediction,
        template: &AggregatedPrediction,
    ) -> Result<EnrichedDocument, PipelineError> {
        let id = record
            .id()
            .ok_or_else(|| PipelineError::parse("Record has no id"))?;

        let mut doc = EnrichedDocument::new(id, standardize(record.text()));
        doc.created_at = record.created_at().map(normalize_timestamp);
        doc.lang = record.lang().map(str::to_string);
        doc.author_id = record.author_id();
        doc.author_handle = record.author_handle().map(str::to_string);
        doc.geo_info = self.extract_geo(record);

        if aggregated != *template {
            doc.predictions = Some(aggregated);
        }

        Ok(doc)
    }

    /// Geo extraction: explicit point coordinates win; otherwise the
    /// author-provided location string is geocoded.
    fn extract_geo(&self, record: &RawRecord) -> Option<GeoInfo> {
        if let Some((longitude, latitude)) = record.coordinates() {
            return Some(GeoInfo {
                longitude: Some(longitude),
                latitude: Some(latitude),
                ..GeoInfo::default()
            });
        }

        let location = record.author_location()?;
        let geo = self.geocoder.resolve(location)?;
        if geo.is_empty() {
            debug!(location = %location, "Geocoder resolved nothing");
            return None;
        }
        Some(geo)
    }
}

impl Default for DocumentEnricher {
    fn default() -> Self {
        Self::new(Arc::new(NoopGeocoder))
    }
}

/// Normalize a source timestamp to RFC 3339.
///
/// Feed payloads carry either RFC 3339 or the legacy
/// `Tue Feb 04 09:30:00 +0000 2020` layout. Anything else passes through
/// unchanged rather than losing the raw value.
fn normalize_timestamp(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y") {
        return parsed.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    debug!(raw = %raw, "Unrecognized timestamp layout");
    raw.to_string()
}
