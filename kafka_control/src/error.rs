use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Problems with caller supplied input, detected before anything is sent to the cluster.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duplicate ACL: {0}")]
    DuplicateAcl(String),
    #[error("Unknown {kind} '{name}'")]
    UnknownName { kind: &'static str, name: String },
    #[error("Topic '{0}' is internal and can't be managed")]
    InternalTopic(String),
    #[error("Topic '{0}' is declared more than once")]
    DuplicateTopic(String),
    #[error("Topic '{topic}' has invalid {field}: {value}")]
    InvalidTopicSetting {
        topic: String,
        field: &'static str,
        value: i32,
    },
    #[error("Desired message count needs to be larger than 0, got {0}")]
    InvalidMessageCount(i64),
    #[error("End of the time range {to} is before its start {from}")]
    InvalidTimeRange {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

/// Configuration of the lag scraper that can't be satisfied. Always fatal.
#[derive(Debug, Error)]
pub enum ScrapeTargetError {
    #[error("Kafka topics mismatch in config and kafka. Configured: {0:?}")]
    TopicsMismatch(Vec<String>),
    #[error("Consumer groups mismatch in config and kafka. Configured: {0:?}")]
    GroupsMismatch(Vec<String>),
    #[error("Minimal poll interval {min:?} is larger than maximal poll interval {max:?}")]
    InvalidInterval { min: Duration, max: Duration },
    #[error("Metadata refresh interval must be larger than zero")]
    ZeroRefreshInterval,
}
