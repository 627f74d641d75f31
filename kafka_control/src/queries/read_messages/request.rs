use crate::error::ValidationError;
use crate::queries::read_messages::Format;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ReadMessagesQueryInternal {
    pub topic: String,
    /// Empty means every partition of the topic.
    pub partitions: Vec<i32>,
    pub mode: ReadMode,
    pub format: Format,
    /// Decode values with the schema registry codec instead of rendering them with `format`.
    pub decode: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadMode {
    Tail {
        count: i64,
        follow: bool,
    },
    History {
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        count: Option<i64>,
    },
}

impl ReadMessagesQueryInternal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.mode {
            ReadMode::Tail { count, .. } if count < 1 => {
                Err(ValidationError::InvalidMessageCount(count))
            }
            ReadMode::History {
                count: Some(count), ..
            } if count < 1 => Err(ValidationError::InvalidMessageCount(count)),
            ReadMode::History {
                from, to: Some(to), ..
            } if to < from => Err(ValidationError::InvalidTimeRange { from, to }),
            _ => Ok(()),
        }
    }
}
