use crate::admin::{create_acl, delete_acl, describe_acls, AdminWrapper};
use crate::cluster::{KafkaCluster, OffsetPoint, PartitionReader};
use crate::connection_settings::KafkaConnectionSettings;
use crate::consumer::ConsumerWrapper;
use crate::models::{
    group_acl_bindings, is_internal_topic, AccessControlEntry, AclResource, BrokerMetadata,
    ClusterMetadata, PartitionMetadata, PartitionOffset, RawMessage, ResourceAcls, Topic,
    TopicConfigEntry, TopicMetadata,
};
use crate::producer::ProducerWrapper;
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::admin::{AlterConfig, NewTopic, ResourceSpecifier, TopicReplication, TopicResult};
use rdkafka::consumer::Consumer;
use rdkafka::error::KafkaError;
use rdkafka::metadata::Metadata;
use rdkafka::producer::FutureRecord;
use rdkafka::util::Timeout;
use rdkafka::{Message, Offset, TopicPartitionList};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// [`KafkaCluster`] backed by librdkafka clients.
pub struct RdKafkaCluster {
    connection_settings: Arc<KafkaConnectionSettings>,
    consumer: Arc<ConsumerWrapper>,
    admin: Arc<AdminWrapper>,
    producer: ProducerWrapper,
    group_consumers: Mutex<HashMap<String, Arc<ConsumerWrapper>>>,
}

impl RdKafkaCluster {
    pub fn connect(connection_settings: KafkaConnectionSettings) -> Result<Self, anyhow::Error> {
        let consumer = ConsumerWrapper::create_for_non_consuming(&connection_settings, None)
            .context("While creating metadata consumer")?;
        let admin = AdminWrapper::create(&connection_settings).context("While creating admin client")?;
        let producer =
            ProducerWrapper::create(&connection_settings).context("While creating producer")?;

        info!("Connected to brokers {:?}", connection_settings.brokers);

        Ok(Self {
            connection_settings: Arc::new(connection_settings),
            consumer: Arc::new(consumer),
            admin: Arc::new(admin),
            producer,
            group_consumers: Mutex::new(HashMap::new()),
        })
    }

    fn timeout(&self) -> Timeout {
        Timeout::After(self.connection_settings.operation_timeout)
    }

    async fn group_consumer(&self, group: &str) -> Result<Arc<ConsumerWrapper>, anyhow::Error> {
        let mut consumers = self.group_consumers.lock().await;
        if let Some(consumer) = consumers.get(group) {
            return Ok(consumer.clone());
        }

        let consumer = Arc::new(
            ConsumerWrapper::create_for_non_consuming(&self.connection_settings, Some(group))
                .with_context(|| format!("While creating consumer for group {}", group))?,
        );
        consumers.insert(group.to_owned(), consumer.clone());

        Ok(consumer)
    }
}

#[async_trait]
impl KafkaCluster for RdKafkaCluster {
    #[tracing::instrument(skip_all)]
    async fn fetch_metadata(&self) -> Result<ClusterMetadata, anyhow::Error> {
        let consumer = self.consumer.clone();
        let timeout = self.timeout();
        tokio::task::spawn_blocking(move || {
            let metadata = consumer
                .fetch_metadata(None, timeout)
                .context("While fetching cluster metadata")?;

            Result::<_, anyhow::Error>::Ok(convert_metadata(&metadata))
        })
        .await
        .context("While joining blocking handle")?
    }

    async fn list_partitions(&self, topic: &str) -> Result<Vec<i32>, anyhow::Error> {
        let consumer = self.consumer.clone();
        let topic = topic.to_owned();
        let timeout = self.timeout();
        tokio::task::spawn_blocking(move || -> Result<Vec<i32>, anyhow::Error> {
            let metadata = consumer
                .fetch_metadata(Some(topic.as_str()), timeout)
                .with_context(|| format!("While fetching metadata of topic {}", topic))?;

            let Some(topic_metadata) = metadata.topics().iter().find(|x| x.name() == topic) else {
                bail!("Topic {} wasn't found", topic)
            };
            if let Some(error) = topic_metadata.error() {
                bail!("Topic {} metadata has error {:?}", topic, error)
            }

            Ok(topic_metadata.partitions().iter().map(|x| x.id()).collect())
        })
        .await
        .context("While joining blocking handle")?
    }

    async fn fetch_offset(
        &self,
        topic: &str,
        partition: i32,
        point: OffsetPoint,
    ) -> Result<Option<i64>, anyhow::Error> {
        let consumer = self.consumer.clone();
        let topic = topic.to_owned();
        let timeout = self.timeout();
        tokio::task::spawn_blocking(move || -> Result<Option<i64>, anyhow::Error> {
            let time = match point {
                OffsetPoint::Oldest | OffsetPoint::Newest => {
                    let (low, high) = consumer
                        .fetch_watermarks(&topic, partition, timeout)
                        .with_context(|| {
                            format!("While fetching watermarks of {}/{}", topic, partition)
                        })?;
                    let offset = if point == OffsetPoint::Oldest { low } else { high };
                    return Ok(Some(offset));
                }
                OffsetPoint::Timestamp(time) => time,
            };

            let mut tpl = TopicPartitionList::new();
            tpl.add_partition_offset(&topic, partition, Offset::Offset(time.timestamp_millis()))
                .context("While building topic partition list")?;
            let offsets = consumer
                .offsets_for_times(tpl, timeout)
                .with_context(|| format!("While looking up offset of {}/{} at {}", topic, partition, time))?;
            let element = offsets
                .find_partition(&topic, partition)
                .with_context(|| format!("Partition {} is missing in offsets response", partition))?;
            element
                .error()
                .with_context(|| format!("While looking up offset of {}/{}", topic, partition))?;

            match element.offset() {
                Offset::Offset(offset) if offset >= 0 => Ok(Some(offset)),
                _ => Ok(None),
            }
        })
        .await
        .context("While joining blocking handle")?
    }

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        start_offset: i64,
        follow: bool,
    ) -> Result<Box<dyn PartitionReader>, anyhow::Error> {
        let group = format!("kafka-control-{}", Uuid::now_v7());
        let consumer =
            ConsumerWrapper::create_for_consuming(&self.connection_settings, &group, !follow)
                .context("While creating consumer")?;

        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, Offset::Offset(start_offset))
            .context("While building topic partition list")?;
        consumer
            .assign(&assignment)
            .with_context(|| format!("While assigning partition {}", partition))?;

        debug!(
            "Assigned {}/{} starting at offset {}",
            topic, partition, start_offset
        );
        Ok(Box::new(StreamPartitionReader { consumer }))
    }

    #[tracing::instrument(skip_all)]
    async fn list_acls(&self) -> Result<Vec<ResourceAcls>, anyhow::Error> {
        let admin = self.admin.clone();
        let bindings = tokio::task::spawn_blocking(move || describe_acls(&admin))
            .await
            .context("While joining blocking handle")?
            .context("While describing ACLs")?;

        Ok(group_acl_bindings(bindings))
    }

    async fn create_acl(
        &self,
        resource: &AclResource,
        entry: &AccessControlEntry,
    ) -> Result<(), anyhow::Error> {
        let admin = self.admin.clone();
        let resource = resource.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || create_acl(&admin, &resource, &entry))
            .await
            .context("While joining blocking handle")?
    }

    async fn delete_acl(
        &self,
        resource: &AclResource,
        entry: &AccessControlEntry,
    ) -> Result<usize, anyhow::Error> {
        let admin = self.admin.clone();
        let resource = resource.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || delete_acl(&admin, &resource, &entry))
            .await
            .context("While joining blocking handle")?
    }

    async fn describe_topic_config(
        &self,
        topic: &str,
    ) -> Result<Vec<TopicConfigEntry>, anyhow::Error> {
        let results = self
            .admin
            .describe_configs(&[ResourceSpecifier::Topic(topic)], &self.admin.options())
            .await
            .with_context(|| format!("While describing configs of topic {}", topic))?;

        let resource = results
            .into_iter()
            .next()
            .context("Describe configs response is empty")?
            .map_err(|code| anyhow!("Describing configs of topic {} failed: {}", topic, code))?;

        Ok(resource
            .entries
            .into_iter()
            .map(|entry| TopicConfigEntry {
                name: entry.name,
                value: entry.value,
                is_default: entry.is_default,
            })
            .collect())
    }

    async fn create_topic(&self, topic: &Topic) -> Result<(), anyhow::Error> {
        let mut new_topic = NewTopic::new(
            &topic.name,
            topic.partitions,
            TopicReplication::Fixed(topic.replication_factor),
        );
        for (key, value) in &topic.configs {
            new_topic = new_topic.set(key, value);
        }

        let results = self
            .admin
            .create_topics(&[new_topic], &self.admin.options())
            .await
            .with_context(|| format!("While creating topic {}", topic.name))?;

        check_topic_results(results)
    }

    async fn delete_topic(&self, topic: &str) -> Result<(), anyhow::Error> {
        let results = self
            .admin
            .delete_topics(&[topic], &self.admin.options())
            .await
            .with_context(|| format!("While deleting topic {}", topic))?;

        check_topic_results(results)
    }

    async fn alter_topic_config(
        &self,
        topic: &str,
        configs: &BTreeMap<String, String>,
    ) -> Result<(), anyhow::Error> {
        let mut alter = AlterConfig::new(ResourceSpecifier::Topic(topic));
        for (key, value) in configs {
            alter = alter.set(key, value);
        }

        let results = self
            .admin
            .alter_configs(&[alter], &self.admin.options())
            .await
            .with_context(|| format!("While altering configs of topic {}", topic))?;

        for result in results {
            if let Err((resource, code)) = result {
                bail!("Altering configs of {:?} failed: {}", resource, code)
            }
        }

        Ok(())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<String>, anyhow::Error> {
        let consumer = self.consumer.clone();
        let timeout = self.timeout();
        tokio::task::spawn_blocking(move || {
            let groups = consumer
                .fetch_group_list(None, timeout)
                .context("While fetching groups")?;

            Result::<_, anyhow::Error>::Ok(
                groups
                    .groups()
                    .iter()
                    .map(|group| group.name().to_owned())
                    .collect::<Vec<_>>(),
            )
        })
        .await
        .context("While joining blocking handle")?
    }

    async fn fetch_committed_offset(
        &self,
        group: &str,
        topic: &str,
        partition: i32,
    ) -> Result<i64, anyhow::Error> {
        let consumer = self.group_consumer(group).await?;
        let topic = topic.to_owned();
        let timeout = self.timeout();
        tokio::task::spawn_blocking(move || {
            let mut tpl = TopicPartitionList::new();
            tpl.add_partition(&topic, partition);
            let committed = consumer
                .committed_offsets(tpl, timeout)
                .context("While fetching committed offsets")?;

            let offset = committed
                .find_partition(&topic, partition)
                .and_then(|element| element.offset().to_raw())
                .unwrap_or(-1);

            Result::<_, anyhow::Error>::Ok(offset)
        })
        .await
        .context("While joining blocking handle")?
    }

    async fn produce(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<PartitionOffset, anyhow::Error> {
        let mut record = FutureRecord::<[u8], [u8]>::to(topic).payload(payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        let (partition, offset) = self
            .producer
            .send(record, self.timeout())
            .await
            .map_err(|(error, _)| error)
            .with_context(|| format!("While producing message to topic {}", topic))?;

        Ok(PartitionOffset::new(partition, offset))
    }
}

struct StreamPartitionReader {
    consumer: ConsumerWrapper,
}

#[async_trait]
impl PartitionReader for StreamPartitionReader {
    async fn next_message(&mut self) -> Result<Option<RawMessage>, anyhow::Error> {
        match self.consumer.recv().await {
            Ok(message) => Ok(Some(RawMessage {
                topic: message.topic().to_owned(),
                partition: message.partition(),
                offset: message.offset(),
                timestamp_millis: message.timestamp().to_millis(),
                key: message.key().map(Bytes::copy_from_slice),
                payload: message.payload().map(Bytes::copy_from_slice),
            })),
            Err(KafkaError::PartitionEOF(partition)) => {
                debug!("Reached end of partition {}", partition);
                Ok(None)
            }
            Err(error) => Err(error).context("While reading message from kafka consumer"),
        }
    }
}

fn check_topic_results(results: Vec<TopicResult>) -> Result<(), anyhow::Error> {
    for result in results {
        if let Err((topic, code)) = result {
            bail!("Operation on topic {} failed: {}", topic, code)
        }
    }

    Ok(())
}

fn convert_metadata(metadata: &Metadata) -> ClusterMetadata {
    let brokers = metadata
        .brokers()
        .iter()
        .map(|broker| BrokerMetadata {
            id: broker.id(),
            host: broker.host().to_owned(),
            port: broker.port(),
        })
        .collect();

    let topics = metadata
        .topics()
        .iter()
        .filter(|topic| topic.error().is_none())
        .map(|topic| TopicMetadata {
            name: topic.name().to_owned(),
            partitions: topic
                .partitions()
                .iter()
                .map(|partition| PartitionMetadata {
                    id: partition.id(),
                    leader: partition.leader(),
                    replicas: partition.replicas().to_vec(),
                    isr: partition.isr().to_vec(),
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    debug!(
        "Fetched metadata of {} topics, {} internal",
        topics.len(),
        topics
            .iter()
            .filter(|topic: &&TopicMetadata| is_internal_topic(&topic.name))
            .count()
    );

    ClusterMetadata { brokers, topics }
}
