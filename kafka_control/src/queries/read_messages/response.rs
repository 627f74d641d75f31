use crate::models::KafkaMessage;

/// What a partition reader sends to the receiver. Every reader finishes with exactly one
/// `Finished`, preceded by `Error` when it failed.
#[derive(Debug)]
pub enum ReaderEvent {
    Message(KafkaMessage),
    Error(anyhow::Error),
    Finished { partition: i32 },
}
