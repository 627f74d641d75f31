use crate::cluster::KafkaCluster;
use crate::models::{Topic, TopicDiff};
use crate::queries::get_topics::get_topics;
use crate::reconcile::{diff_topics, validate_topics};
use tracing::info;

#[tracing::instrument(skip_all)]
pub async fn get_topics_diff(
    cluster: &dyn KafkaCluster,
    desired: &[Topic],
) -> Result<TopicDiff, anyhow::Error> {
    validate_topics(desired)?;

    let existing = get_topics(cluster, false).await?;
    let diff = diff_topics(desired, &existing);
    info!(
        "Topics to create: {}, to delete: {}, to alter: {}",
        diff.to_create.len(),
        diff.to_delete.len(),
        diff.to_alter.len()
    );

    Ok(diff)
}
