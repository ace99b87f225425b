//! Raw record representation.
//!
//! A raw record is one line of a newline-delimited JSON object read from
//! blob storage. The payload shape varies between sources, so the record
//! wraps the parsed JSON value and exposes typed accessors for the fields
//! the pipeline cares about.

use serde_json::Value;

/// A source record as decoded from storage. Immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    value: Value,
}

impl RawRecord {
    /// Wrap a parsed JSON value.
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// The record's unique identifier, if present.
    ///
    /// Accepts both string and integer ids since upstream sources are not
    /// consistent about the type.
    pub fn id(&self) -> Option<String> {
        match self.value.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The record's text body. Records without a text field yield an empty
    /// string so that downstream batching stays aligned with record order.
    pub fn text(&self) -> &str {
        self.value.get("text").and_then(Value::as_str).unwrap_or("")
    }

    /// The raw creation timestamp, if present.
    pub fn created_at(&self) -> Option<&str> {
        self.value.get("created_at").and_then(Value::as_str)
    }

    /// The record's language tag, if present.
    pub fn lang(&self) -> Option<&str> {
        self.value.get("lang").and_then(Value::as_str)
    }

    /// The author's identifier, if present.
    pub fn author_id(&self) -> Option<String> {
        match self.value.get("user").and_then(|u| u.get("id")) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The author's handle, if present.
    pub fn author_handle(&self) -> Option<&str> {
        self.value
            .get("user")
            .and_then(|u| u.get("screen_name"))
            .and_then(Value::as_str)
    }

    /// The author's free-form location string, if present.
    pub fn author_location(&self) -> Option<&str> {
        self.value
            .get("user")
            .and_then(|u| u.get("location"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Explicit point coordinates as (longitude, latitude), if present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let coords = self
            .value
            .get("coordinates")
            .and_then(|c| c.get("coordinates"))
            .and_then(Value::as_array)?;
        match coords.as_slice() {
            [lon, lat] => Some((lon.as_f64()?, lat.as_f64()?)),
            _ => None,
        }
    }

    /// Access the underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}
