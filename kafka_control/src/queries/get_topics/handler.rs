use crate::cluster::KafkaCluster;
use crate::models::{is_internal_topic, non_default_configs, Topic};
use anyhow::Context;
use tracing::debug;

/// Lists topics with their non-default configuration, sorted by name.
#[tracing::instrument(skip_all)]
pub async fn get_topics(
    cluster: &dyn KafkaCluster,
    include_internal: bool,
) -> Result<Vec<Topic>, anyhow::Error> {
    let metadata = cluster
        .fetch_metadata()
        .await
        .context("While fetching metadata")?;

    let mut topics = Vec::with_capacity(metadata.topics.len());
    for topic in metadata.topics {
        if !include_internal && is_internal_topic(&topic.name) {
            continue;
        }

        let entries = cluster
            .describe_topic_config(&topic.name)
            .await
            .with_context(|| format!("While describing topic {}", topic.name))?;
        debug!("Topic {} has {} config entries", topic.name, entries.len());

        topics.push(Topic {
            partitions: topic.partitions.len() as i32,
            replication_factor: topic.replication_factor(),
            configs: non_default_configs(&entries),
            name: topic.name,
        });
    }

    topics.sort_by(|left, right| left.name.cmp(&right.name));
    Ok(topics)
}
