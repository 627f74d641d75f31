use crate::cluster::KafkaCluster;
use crate::queries::get_cluster_status::PartitionStatus;
use anyhow::Context;

/// Leader and replica placement of every partition, sorted by topic and partition.
#[tracing::instrument(skip_all)]
pub async fn get_cluster_status(
    cluster: &dyn KafkaCluster,
) -> Result<Vec<PartitionStatus>, anyhow::Error> {
    let metadata = cluster
        .fetch_metadata()
        .await
        .context("While fetching metadata")?;

    let mut statuses = metadata
        .topics
        .into_iter()
        .flat_map(|topic| {
            let name = topic.name;
            topic
                .partitions
                .into_iter()
                .map(move |partition| PartitionStatus {
                    topic: name.clone(),
                    partition: partition.id,
                    leader: partition.leader,
                    replicas: partition.replicas,
                    in_sync_replicas: partition.isr,
                })
        })
        .collect::<Vec<_>>();

    statuses.sort_by(|left, right| {
        left.topic
            .cmp(&right.topic)
            .then(left.partition.cmp(&right.partition))
    });

    Ok(statuses)
}
