use crate::models::{
    AccessControlEntry, AclResource, ClusterMetadata, PartitionOffset, RawMessage, ResourceAcls,
    Topic, TopicConfigEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OffsetPoint {
    Oldest,
    /// Offset the next produced message will get.
    Newest,
    /// First offset whose message timestamp is at or after the given time.
    Timestamp(DateTime<Utc>),
}

#[async_trait]
pub trait PartitionReader: Send {
    /// `None` once the end of the partition is reached. A following reader never returns it.
    async fn next_message(&mut self) -> Result<Option<RawMessage>, anyhow::Error>;
}

/// Everything the tool asks of a Kafka cluster.
#[async_trait]
pub trait KafkaCluster: Send + Sync {
    async fn fetch_metadata(&self) -> Result<ClusterMetadata, anyhow::Error>;

    async fn list_partitions(&self, topic: &str) -> Result<Vec<i32>, anyhow::Error>;

    /// `None` when no message satisfies a timestamp lookup.
    async fn fetch_offset(
        &self,
        topic: &str,
        partition: i32,
        point: OffsetPoint,
    ) -> Result<Option<i64>, anyhow::Error>;

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        start_offset: i64,
        follow: bool,
    ) -> Result<Box<dyn PartitionReader>, anyhow::Error>;

    async fn list_acls(&self) -> Result<Vec<ResourceAcls>, anyhow::Error>;

    async fn create_acl(
        &self,
        resource: &AclResource,
        entry: &AccessControlEntry,
    ) -> Result<(), anyhow::Error>;

    /// Returns how many bindings were removed.
    async fn delete_acl(
        &self,
        resource: &AclResource,
        entry: &AccessControlEntry,
    ) -> Result<usize, anyhow::Error>;

    async fn describe_topic_config(
        &self,
        topic: &str,
    ) -> Result<Vec<TopicConfigEntry>, anyhow::Error>;

    async fn create_topic(&self, topic: &Topic) -> Result<(), anyhow::Error>;

    async fn delete_topic(&self, topic: &str) -> Result<(), anyhow::Error>;

    /// Replaces the whole dynamic configuration of the topic.
    async fn alter_topic_config(
        &self,
        topic: &str,
        configs: &BTreeMap<String, String>,
    ) -> Result<(), anyhow::Error>;

    async fn list_consumer_groups(&self) -> Result<Vec<String>, anyhow::Error>;

    /// Negative when the group has no committed offset for the partition.
    async fn fetch_committed_offset(
        &self,
        group: &str,
        topic: &str,
        partition: i32,
    ) -> Result<i64, anyhow::Error>;

    async fn produce(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<PartitionOffset, anyhow::Error>;
}
