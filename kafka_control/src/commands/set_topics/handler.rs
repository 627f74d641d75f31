use crate::cluster::KafkaCluster;
use crate::error::ValidationError;
use crate::models::{is_internal_topic, non_default_configs, TopicDiff};
use anyhow::Context;
use tracing::info;

/// Deletes, creates, then alters topics. An alteration keeps every override the topic
/// already has and only adds or replaces the changed keys.
#[tracing::instrument(skip_all)]
pub async fn apply_topics_diff(
    cluster: &dyn KafkaCluster,
    diff: &TopicDiff,
) -> Result<(), anyhow::Error> {
    let names = diff
        .to_create
        .iter()
        .chain(&diff.to_delete)
        .map(|topic| topic.name.as_str())
        .chain(diff.to_alter.iter().map(|altered| altered.topic_name.as_str()));
    for name in names {
        if is_internal_topic(name) {
            return Err(ValidationError::InternalTopic(name.to_owned()).into());
        }
    }

    for topic in &diff.to_delete {
        cluster
            .delete_topic(&topic.name)
            .await
            .with_context(|| format!("While deleting topic {}", topic.name))?;
        info!("Deleted topic {}", topic.name);
    }

    for topic in &diff.to_create {
        cluster
            .create_topic(topic)
            .await
            .with_context(|| format!("While creating topic {}", topic.name))?;
        info!(
            "Created topic {} with {} partitions",
            topic.name, topic.partitions
        );
    }

    for altered in &diff.to_alter {
        let current = cluster
            .describe_topic_config(&altered.topic_name)
            .await
            .with_context(|| format!("While describing topic {}", altered.topic_name))?;

        let mut configs = non_default_configs(&current);
        configs.extend(altered.configs.clone());

        cluster
            .alter_topic_config(&altered.topic_name, &configs)
            .await
            .with_context(|| format!("While altering topic {}", altered.topic_name))?;
        info!(
            "Altered topic {}: {:?}",
            altered.topic_name, altered.configs
        );
    }

    Ok(())
}
