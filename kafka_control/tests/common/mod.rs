#![allow(dead_code)]

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use kafka_control::cluster::{KafkaCluster, OffsetPoint, PartitionReader};
use kafka_control::models::{
    group_acl_bindings, AccessControlEntry, AclResource, BrokerMetadata, ClusterMetadata,
    PartitionMetadata, PartitionOffset, PatternType, RawMessage, ResourceAcls, Topic,
    TopicConfigEntry, TopicMetadata,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Default)]
struct PartitionLog {
    /// Offset of the first retained message.
    base_offset: i64,
    messages: Vec<RawMessage>,
}

impl PartitionLog {
    fn newest(&self) -> i64 {
        self.base_offset + self.messages.len() as i64
    }

    fn message_at(&self, offset: i64) -> Option<RawMessage> {
        if offset < self.base_offset {
            return None;
        }

        self.messages.get((offset - self.base_offset) as usize).cloned()
    }
}

struct TopicState {
    replication_factor: i32,
    configs: BTreeMap<String, String>,
    partitions: Vec<PartitionLog>,
}

#[derive(Default)]
struct State {
    topics: BTreeMap<String, TopicState>,
    acls: Vec<(AclResource, AccessControlEntry)>,
    groups: Vec<String>,
    committed: HashMap<(String, String, i32), i64>,
    failing_acl_principals: HashSet<String>,
    failing_partitions: HashSet<(String, i32)>,
    failing_committed_partitions: HashSet<(String, i32)>,
    failing_metadata: bool,
    failing_group_listing: bool,
    calls: Vec<String>,
}

/// In-memory cluster. Cloning shares the same state.
#[derive(Clone)]
pub struct MemoryCluster {
    state: Arc<Mutex<State>>,
    changes: Arc<watch::Sender<u64>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            changes: Arc::new(changes),
        }
    }

    pub fn add_topic(&self, name: &str, partitions: i32) {
        self.add_topic_with_configs(name, partitions, &[]);
    }

    pub fn add_topic_with_configs(&self, name: &str, partitions: i32, configs: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.topics.insert(
            name.to_owned(),
            TopicState {
                replication_factor: 1,
                configs: configs
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
                partitions: (0..partitions).map(|_| PartitionLog::default()).collect(),
            },
        );
    }

    pub fn add_partition(&self, topic: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .topics
            .get_mut(topic)
            .unwrap()
            .partitions
            .push(PartitionLog::default());
    }

    /// Drops messages below `offset`, like retention does.
    pub fn truncate(&self, topic: &str, partition: i32, offset: i64) {
        let mut state = self.state.lock().unwrap();
        let log = &mut state.topics.get_mut(topic).unwrap().partitions[partition as usize];
        let drop = (offset - log.base_offset).clamp(0, log.messages.len() as i64) as usize;
        log.messages.drain(..drop);
        log.base_offset = offset;
    }

    pub fn append(&self, topic: &str, partition: i32, timestamp: DateTime<Utc>, value: &[u8]) -> i64 {
        let offset = {
            let mut state = self.state.lock().unwrap();
            let log = &mut state.topics.get_mut(topic).unwrap().partitions[partition as usize];
            let offset = log.newest();
            log.messages.push(RawMessage {
                topic: topic.to_owned(),
                partition,
                offset,
                timestamp_millis: Some(timestamp.timestamp_millis()),
                key: None,
                payload: Some(Bytes::copy_from_slice(value)),
            });
            offset
        };
        self.changes.send_modify(|version| *version += 1);

        offset
    }

    pub fn add_acl(&self, resource: AclResource, entry: AccessControlEntry) {
        self.state.lock().unwrap().acls.push((resource, entry));
    }

    pub fn add_group(&self, group: &str) {
        self.state.lock().unwrap().groups.push(group.to_owned());
    }

    pub fn commit(&self, group: &str, topic: &str, partition: i32, offset: i64) {
        self.state
            .lock()
            .unwrap()
            .committed
            .insert((group.to_owned(), topic.to_owned(), partition), offset);
    }

    pub fn fail_acl_creation_for(&self, principal: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_acl_principals
            .insert(principal.to_owned());
    }

    pub fn fail_reading(&self, topic: &str, partition: i32) {
        self.state
            .lock()
            .unwrap()
            .failing_partitions
            .insert((topic.to_owned(), partition));
    }

    pub fn fail_committed_offset(&self, topic: &str, partition: i32) {
        self.state
            .lock()
            .unwrap()
            .failing_committed_partitions
            .insert((topic.to_owned(), partition));
    }

    pub fn fail_metadata(&self, failing: bool) {
        self.state.lock().unwrap().failing_metadata = failing;
    }

    pub fn fail_group_listing(&self, failing: bool) {
        self.state.lock().unwrap().failing_group_listing = failing;
    }

    pub fn topic_configs(&self, topic: &str) -> BTreeMap<String, String> {
        self.state.lock().unwrap().topics[topic].configs.clone()
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.state.lock().unwrap().topics.keys().cloned().collect()
    }

    pub fn acl_bindings(&self) -> Vec<(AclResource, AccessControlEntry)> {
        self.state.lock().unwrap().acls.clone()
    }

    /// Mutating calls in the order they were made.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn with_log<T>(
        &self,
        topic: &str,
        partition: i32,
        f: impl FnOnce(&PartitionLog) -> T,
    ) -> Result<T, anyhow::Error> {
        let state = self.state.lock().unwrap();
        let topic_state = state
            .topics
            .get(topic)
            .ok_or_else(|| anyhow!("Unknown topic {}", topic))?;
        let log = topic_state
            .partitions
            .get(partition as usize)
            .ok_or_else(|| anyhow!("Unknown partition {}", partition))?;

        Ok(f(log))
    }
}

struct MemoryPartitionReader {
    cluster: MemoryCluster,
    topic: String,
    partition: i32,
    next_offset: i64,
    follow: bool,
    changes: watch::Receiver<u64>,
}

#[async_trait]
impl PartitionReader for MemoryPartitionReader {
    async fn next_message(&mut self) -> Result<Option<RawMessage>, anyhow::Error> {
        loop {
            self.changes.borrow_and_update();
            if self
                .cluster
                .state
                .lock()
                .unwrap()
                .failing_partitions
                .contains(&(self.topic.clone(), self.partition))
            {
                bail!("Broker went away while reading partition {}", self.partition)
            }

            let message = self
                .cluster
                .with_log(&self.topic, self.partition, |log| log.message_at(self.next_offset))?;
            if let Some(message) = message {
                self.next_offset += 1;
                return Ok(Some(message));
            }

            if !self.follow {
                return Ok(None);
            }
            if self.changes.changed().await.is_err() {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl KafkaCluster for MemoryCluster {
    async fn fetch_metadata(&self) -> Result<ClusterMetadata, anyhow::Error> {
        let state = self.state.lock().unwrap();
        if state.failing_metadata {
            bail!("Metadata request timed out")
        }
        let topics = state
            .topics
            .iter()
            .map(|(name, topic)| TopicMetadata {
                name: name.clone(),
                partitions: (0..topic.partitions.len() as i32)
                    .map(|id| PartitionMetadata {
                        id,
                        leader: 1,
                        replicas: (1..=topic.replication_factor).collect(),
                        isr: (1..=topic.replication_factor).collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(ClusterMetadata {
            brokers: vec![BrokerMetadata {
                id: 1,
                host: "localhost".to_owned(),
                port: 9092,
            }],
            topics,
        })
    }

    async fn list_partitions(&self, topic: &str) -> Result<Vec<i32>, anyhow::Error> {
        let state = self.state.lock().unwrap();
        let topic = state
            .topics
            .get(topic)
            .ok_or_else(|| anyhow!("Topic {} wasn't found", topic))?;

        Ok((0..topic.partitions.len() as i32).collect())
    }

    async fn fetch_offset(
        &self,
        topic: &str,
        partition: i32,
        point: OffsetPoint,
    ) -> Result<Option<i64>, anyhow::Error> {
        self.with_log(topic, partition, |log| match point {
            OffsetPoint::Oldest => Some(log.base_offset),
            OffsetPoint::Newest => Some(log.newest()),
            OffsetPoint::Timestamp(time) => log
                .messages
                .iter()
                .find(|message| message.timestamp_millis >= Some(time.timestamp_millis()))
                .map(|message| message.offset),
        })
    }

    async fn consume_partition(
        &self,
        topic: &str,
        partition: i32,
        start_offset: i64,
        follow: bool,
    ) -> Result<Box<dyn PartitionReader>, anyhow::Error> {
        self.with_log(topic, partition, |_| ())?;

        Ok(Box::new(MemoryPartitionReader {
            cluster: self.clone(),
            topic: topic.to_owned(),
            partition,
            next_offset: start_offset,
            follow,
            changes: self.changes.subscribe(),
        }))
    }

    async fn list_acls(&self) -> Result<Vec<ResourceAcls>, anyhow::Error> {
        Ok(group_acl_bindings(self.acl_bindings()))
    }

    async fn create_acl(
        &self,
        resource: &AclResource,
        entry: &AccessControlEntry,
    ) -> Result<(), anyhow::Error> {
        self.record(format!("create_acl {} {}", resource.name, entry.principal));
        let mut state = self.state.lock().unwrap();
        if state.failing_acl_principals.contains(&entry.principal) {
            bail!("Broker rejected ACL for {}", entry.principal)
        }

        // Brokers have no unknown pattern type, they store such a binding as literal.
        let mut resource = resource.clone();
        if resource.pattern_type == PatternType::Unknown {
            resource.pattern_type = PatternType::Literal;
        }
        let binding = (resource, entry.clone());
        if !state.acls.contains(&binding) {
            state.acls.push(binding);
        }

        Ok(())
    }

    async fn delete_acl(
        &self,
        resource: &AclResource,
        entry: &AccessControlEntry,
    ) -> Result<usize, anyhow::Error> {
        self.record(format!("delete_acl {} {}", resource.name, entry.principal));
        let mut state = self.state.lock().unwrap();
        let before = state.acls.len();
        state
            .acls
            .retain(|(bound_resource, bound_entry)| bound_resource != resource || bound_entry != entry);

        Ok(before - state.acls.len())
    }

    async fn describe_topic_config(
        &self,
        topic: &str,
    ) -> Result<Vec<TopicConfigEntry>, anyhow::Error> {
        let state = self.state.lock().unwrap();
        let topic_state = state
            .topics
            .get(topic)
            .ok_or_else(|| anyhow!("Unknown topic {}", topic))?;

        let mut entries = vec![TopicConfigEntry {
            name: "compression.type".to_owned(),
            value: Some("producer".to_owned()),
            is_default: true,
        }];
        entries.extend(topic_state.configs.iter().map(|(name, value)| TopicConfigEntry {
            name: name.clone(),
            value: Some(value.clone()),
            is_default: false,
        }));

        Ok(entries)
    }

    async fn create_topic(&self, topic: &Topic) -> Result<(), anyhow::Error> {
        self.record(format!("create_topic {}", topic.name));
        let mut state = self.state.lock().unwrap();
        if state.topics.contains_key(&topic.name) {
            bail!("Topic {} already exists", topic.name)
        }

        state.topics.insert(
            topic.name.clone(),
            TopicState {
                replication_factor: topic.replication_factor,
                configs: topic.configs.clone(),
                partitions: (0..topic.partitions).map(|_| PartitionLog::default()).collect(),
            },
        );

        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<(), anyhow::Error> {
        self.record(format!("delete_topic {}", topic));
        self.state
            .lock()
            .unwrap()
            .topics
            .remove(topic)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Unknown topic {}", topic))
    }

    async fn alter_topic_config(
        &self,
        topic: &str,
        configs: &BTreeMap<String, String>,
    ) -> Result<(), anyhow::Error> {
        self.record(format!("alter_topic {}", topic));
        let mut state = self.state.lock().unwrap();
        let topic_state = state
            .topics
            .get_mut(topic)
            .ok_or_else(|| anyhow!("Unknown topic {}", topic))?;
        topic_state.configs = configs.clone();

        Ok(())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<String>, anyhow::Error> {
        let state = self.state.lock().unwrap();
        if state.failing_group_listing {
            bail!("Group coordinator is loading")
        }

        Ok(state.groups.clone())
    }

    async fn fetch_committed_offset(
        &self,
        group: &str,
        topic: &str,
        partition: i32,
    ) -> Result<i64, anyhow::Error> {
        let state = self.state.lock().unwrap();
        if state
            .failing_committed_partitions
            .contains(&(topic.to_owned(), partition))
        {
            bail!("Coordinator not available")
        }

        Ok(*state
            .committed
            .get(&(group.to_owned(), topic.to_owned(), partition))
            .unwrap_or(&-1001))
    }

    async fn produce(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<PartitionOffset, anyhow::Error> {
        let offset = self.append(topic, 0, Utc::now(), payload);
        if let Some(key) = key {
            let mut state = self.state.lock().unwrap();
            let log = &mut state.topics.get_mut(topic).unwrap().partitions[0];
            if let Some(message) = log.messages.last_mut() {
                message.key = Some(Bytes::copy_from_slice(key));
            }
        }

        Ok(PartitionOffset::new(0, offset))
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000 + seconds, 0).unwrap()
}
