use bytes::Bytes;
use chrono::{DateTime, Utc};
use getset::Getters;
use serde::Serialize;

#[derive(Debug, Getters, Copy, Clone, PartialEq, Eq, Serialize)]
#[getset(get = "pub")]
pub struct PartitionOffset {
    partition: i32,
    offset: i64,
}

impl PartitionOffset {
    pub fn new(partition: i32, offset: i64) -> PartitionOffset {
        Self { offset, partition }
    }
}

/// Message handed to callers, with the payload already rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KafkaMessage {
    pub topic: String,
    #[serde(flatten)]
    pub partition_offset: PartitionOffset,
    pub timestamp: DateTime<Utc>,
    pub key: Option<String>,
    pub value: Option<String>,
}

/// Message as read from a partition, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub timestamp_millis: Option<i64>,
    pub key: Option<Bytes>,
    pub payload: Option<Bytes>,
}
