use crate::cluster::{KafkaCluster, OffsetPoint};
use crate::codec::AvroCodec;
use crate::models::{KafkaMessage, PartitionOffset, RawMessage};
use crate::queries::read_messages::{
    MessageReceiver, PartitionBounds, ReadMessagesQueryInternal, ReadMode, ReaderEvent,
};
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, trace, warn, Instrument};

const CHANNEL_CAPACITY: usize = 128;

/// Starts one reader task per partition, all feeding a single receiver.
#[tracing::instrument(skip_all, fields(topic = %query.topic))]
pub async fn run_read_messages_to_channel(
    cluster: Arc<dyn KafkaCluster>,
    query: ReadMessagesQueryInternal,
    codec: Option<Arc<AvroCodec>>,
) -> Result<MessageReceiver, anyhow::Error> {
    query.validate()?;
    if query.decode && codec.is_none() {
        bail!("Decoding was requested but no schema registry is configured")
    }

    let partitions = if query.partitions.is_empty() {
        cluster
            .list_partitions(&query.topic)
            .await
            .context("While fetching partitions")?
    } else {
        query.partitions.clone()
    };

    if partitions.is_empty() {
        bail!("Topic {} has no partitions", query.topic)
    }

    debug!(
        "Starting {} readers for topic {}",
        partitions.len(),
        query.topic
    );

    let codec = if query.decode { codec } else { None };
    let cancellation_token = CancellationToken::new();
    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);
    let query = Arc::new(query);

    for partition in partitions.iter().copied() {
        let future = consume_partition(
            cluster.clone(),
            query.clone(),
            codec.clone(),
            partition,
            tx.clone(),
            cancellation_token.clone(),
        )
        .instrument(info_span!("Consuming partition", partition).or_current());
        tokio::task::spawn(future);
    }

    Ok(MessageReceiver::new(rx, cancellation_token, partitions.len()))
}

/// Reads a bounded time range and returns it sorted by timestamp.
#[tracing::instrument(skip_all, fields(topic = %query.topic))]
pub async fn read_history(
    cluster: Arc<dyn KafkaCluster>,
    query: ReadMessagesQueryInternal,
    codec: Option<Arc<AvroCodec>>,
) -> Result<Vec<KafkaMessage>, anyhow::Error> {
    if !matches!(query.mode, ReadMode::History { .. }) {
        bail!("Reading history requires a time range")
    }

    let mut receiver = run_read_messages_to_channel(cluster, query, codec).await?;
    let mut messages = vec![];
    while let Some(message) = receiver.next().await? {
        messages.push(message);
    }

    messages.sort_by_key(|message| message.timestamp);
    info!("Read {} messages", messages.len());

    Ok(messages)
}

async fn consume_partition(
    cluster: Arc<dyn KafkaCluster>,
    query: Arc<ReadMessagesQueryInternal>,
    codec: Option<Arc<AvroCodec>>,
    partition: i32,
    tx: Sender<ReaderEvent>,
    cancellation_token: CancellationToken,
) {
    if let Err(error) = read_partition(
        cluster.as_ref(),
        &query,
        codec.as_deref(),
        partition,
        &tx,
        &cancellation_token,
    )
    .await
    {
        error!(
            "Error while reading partition {} of topic {}: {:?}",
            partition, query.topic, error
        );
        let _ = tx.send(ReaderEvent::Error(error)).await;
    }

    let _ = tx.send(ReaderEvent::Finished { partition }).await;
}

async fn read_partition(
    cluster: &dyn KafkaCluster,
    query: &ReadMessagesQueryInternal,
    codec: Option<&AvroCodec>,
    partition: i32,
    tx: &Sender<ReaderEvent>,
    cancellation_token: &CancellationToken,
) -> Result<(), anyhow::Error> {
    let Some(bounds) = plan_partition(cluster, query, partition).await? else {
        return Ok(());
    };

    info!(
        "Reading partition {} from offset {} to {:?}",
        partition, bounds.start, bounds.end
    );

    let follow = bounds.end.is_none();
    let mut reader = select! {
        reader = cluster.consume_partition(&query.topic, partition, bounds.start, follow) => {
            reader.context("While creating partition reader")?
        }
        _ = cancellation_token.cancelled() => {
            return Ok(())
        }
    };

    loop {
        let next = select! {
            next = reader.next_message() => {
                next?
            }
            _ = cancellation_token.cancelled() => {
                info!("Consuming partition {} was cancelled", partition);
                return Ok(())
            }
        };

        let Some(message) = next else {
            debug!("Partition {} has no more messages", partition);
            return Ok(());
        };

        if bounds.is_past_end(message.offset) {
            return Ok(());
        }

        trace!(
            "New message. Topic: '{}', partition: {}, offset: {}",
            message.topic,
            message.partition,
            message.offset,
        );

        let offset = message.offset;
        let converted = convert_message(message, query, codec).await?;
        select! {
            sent = tx.send(ReaderEvent::Message(converted)) => {
                if sent.is_err() {
                    return Ok(())
                }
            }
            _ = cancellation_token.cancelled() => {
                return Ok(())
            }
        }

        if bounds.is_past_end(offset + 1) {
            return Ok(());
        }
    }
}

async fn plan_partition(
    cluster: &dyn KafkaCluster,
    query: &ReadMessagesQueryInternal,
    partition: i32,
) -> Result<Option<PartitionBounds>, anyhow::Error> {
    let topic = &query.topic;
    match query.mode {
        ReadMode::Tail { count, follow } => {
            let oldest = required_offset(cluster, topic, partition, OffsetPoint::Oldest).await?;
            let newest = required_offset(cluster, topic, partition, OffsetPoint::Newest).await?;

            Ok(PartitionBounds::tail(partition, oldest, newest, count, follow))
        }
        ReadMode::History { from, to, count } => {
            let start = cluster
                .fetch_offset(topic, partition, OffsetPoint::Timestamp(from))
                .await
                .context("While looking up start offset")?;
            let Some(start) = start else {
                warn!("No messages on partition {} after {}", partition, from);
                return Ok(None);
            };

            let newest = required_offset(cluster, topic, partition, OffsetPoint::Newest).await?;
            let end = match to {
                Some(to) => cluster
                    .fetch_offset(topic, partition, OffsetPoint::Timestamp(to))
                    .await
                    .context("While looking up end offset")?
                    .unwrap_or(newest),
                None => newest,
            };

            Ok(PartitionBounds::history(partition, start, end, count))
        }
    }
}

async fn required_offset(
    cluster: &dyn KafkaCluster,
    topic: &str,
    partition: i32,
    point: OffsetPoint,
) -> Result<i64, anyhow::Error> {
    cluster
        .fetch_offset(topic, partition, point)
        .await
        .with_context(|| format!("While fetching {:?} offset of partition {}", point, partition))?
        .with_context(|| format!("Partition {} has no {:?} offset", partition, point))
}

async fn convert_message(
    message: RawMessage,
    query: &ReadMessagesQueryInternal,
    codec: Option<&AvroCodec>,
) -> Result<KafkaMessage, anyhow::Error> {
    let timestamp = message
        .timestamp_millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH);
    let key = message
        .key
        .as_deref()
        .map(|key| String::from_utf8_lossy(key).into_owned());

    let value = match (message.payload.as_deref(), codec) {
        (None, _) => None,
        (Some(payload), Some(codec)) => Some(codec.decode(payload).await.with_context(|| {
            format!(
                "While decoding message at partition {} offset {}",
                message.partition, message.offset
            )
        })?),
        (Some(payload), None) => Some(query.format.bytes_to_string(payload)),
    };

    Ok(KafkaMessage {
        topic: message.topic,
        partition_offset: PartitionOffset::new(message.partition, message.offset),
        timestamp,
        key,
        value,
    })
}
