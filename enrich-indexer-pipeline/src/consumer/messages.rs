//! Message types for the consumer.
//!
//! Storage events arrive as S3-style notification payloads: a JSON document
//! with a `Records` array where each entry names the bucket and key of a
//! newly written object.

use serde::Deserialize;

use crate::errors::PipelineError;

/// Reference to one object in blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

/// Messages that flow from the consumer to the orchestrator.
#[derive(Debug)]
pub enum StreamMessage {
    /// Storage objects announced by one notification.
    Events(Vec<ObjectRef>),
    /// An error occurred.
    Error(String),
    /// Stream has ended.
    End,
}

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
struct NotificationRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Parse a storage notification payload into object references.
pub fn parse_notification(payload: &[u8]) -> Result<Vec<ObjectRef>, PipelineError> {
    let notification: Notification = serde_json::from_slice(payload)
        .map_err(|e| PipelineError::parse(format!("Invalid storage notification: {}", e)))?;

    Ok(notification
        .records
        .into_iter()
        .map(|record| ObjectRef {
            bucket: record.s3.bucket.name,
            key: record.s3.object.key,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let payload = br#"{
            "Records": [
                {"s3": {"bucket": {"name": "data-stg"}, "object": {"key": "tweets/project_vaccine/part-0.jsonl.gz"}}},
                {"s3": {"bucket": {"name": "data-stg"}, "object": {"key": "tweets/project_vaccine/part-1.jsonl.gz"}}}
            ]
        }"#;

        let refs = parse_notification(payload).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].bucket, "data-stg");
        assert_eq!(refs[1].key, "tweets/project_vaccine/part-1.jsonl.gz");
    }

    #[test]
    fn test_parse_notification_empty_records() {
        let refs = parse_notification(b"{}").unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn test_parse_notification_malformed() {
        assert!(parse_notification(b"not json").is_err());
    }
}
