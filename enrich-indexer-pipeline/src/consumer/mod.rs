//! Consumer module for the enrichment pipeline.
//!
//! Provides Kafka consumer functionality for receiving storage-event
//! notifications.

mod kafka_consumer;
mod messages;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{parse_notification, ObjectRef, StreamMessage};
