use crate::cluster::{KafkaCluster, OffsetPoint};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLag {
    pub partition: i32,
    pub committed_offset: i64,
    pub log_end_offset: i64,
    pub lag: i64,
}

/// `None` when the group has no committed offset.
pub fn compute_lag(committed_offset: i64, log_end_offset: i64) -> Option<i64> {
    if committed_offset < 0 {
        return None;
    }

    Some(log_end_offset - committed_offset)
}

/// Lag of one group on the given partitions of a topic. Partitions whose offsets
/// can't be fetched are skipped.
pub async fn fetch_group_topic_lags(
    cluster: &dyn KafkaCluster,
    group: &str,
    topic: &str,
    partitions: &[i32],
) -> Vec<PartitionLag> {
    let mut lags = Vec::with_capacity(partitions.len());
    for &partition in partitions {
        let committed_offset = match cluster.fetch_committed_offset(group, topic, partition).await {
            Ok(offset) => offset,
            Err(e) => {
                warn!(
                    "Error while fetching committed offset of group {} for {}/{}: {:?}",
                    group, topic, partition, e
                );
                continue;
            }
        };

        let log_end_offset = match cluster.fetch_offset(topic, partition, OffsetPoint::Newest).await {
            Ok(Some(offset)) => offset,
            Ok(None) => {
                warn!("No log end offset for {}/{}", topic, partition);
                continue;
            }
            Err(e) => {
                warn!(
                    "Error while fetching log end offset for {}/{}: {:?}",
                    topic, partition, e
                );
                continue;
            }
        };

        let Some(lag) = compute_lag(committed_offset, log_end_offset) else {
            debug!(
                "Group {} has no committed offset for {}/{}",
                group, topic, partition
            );
            continue;
        };

        lags.push(PartitionLag {
            partition,
            committed_offset,
            log_end_offset,
            lag,
        });
    }

    lags
}
