use crate::error::ValidationError;
use crate::models::{AlteredConfigs, Topic, TopicDiff};
use crate::reconcile::{diff, Matched, Reconcilable};
use std::collections::{BTreeMap, HashSet};

impl Reconcilable for Topic {
    type Key = String;
    type Alteration = AlteredConfigs;

    fn key(&self) -> Self::Key {
        self.name.clone()
    }

    fn merge(&mut self, other: Self) {
        self.partitions = other.partitions;
        self.replication_factor = other.replication_factor;
        self.configs.extend(other.configs);
    }

    /// Partition count and replication factor of an existing topic are left alone.
    fn reconcile(desired: &Self, existing: &Self) -> Matched<Self, AlteredConfigs> {
        let configs: BTreeMap<String, String> = desired
            .configs
            .iter()
            .filter(|(key, value)| existing.configs.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if configs.is_empty() {
            return Matched::unchanged();
        }

        Matched {
            alter: Some(AlteredConfigs {
                topic_name: desired.name.clone(),
                configs,
            }),
            ..Matched::unchanged()
        }
    }
}

/// Internal topics on the existing side never take part in the comparison.
pub fn diff_topics(desired: &[Topic], existing: &[Topic]) -> TopicDiff {
    let existing = existing
        .iter()
        .filter(|topic| !topic.is_internal())
        .cloned()
        .collect::<Vec<_>>();
    let reconciliation = diff(desired, &existing);

    TopicDiff {
        to_create: reconciliation.to_create,
        to_delete: reconciliation.to_delete,
        to_alter: reconciliation.to_alter,
    }
}

pub fn validate_topics(topics: &[Topic]) -> Result<(), ValidationError> {
    let mut names = HashSet::with_capacity(topics.len());
    for topic in topics {
        if topic.is_internal() {
            return Err(ValidationError::InternalTopic(topic.name.clone()));
        }
        if !names.insert(topic.name.as_str()) {
            return Err(ValidationError::DuplicateTopic(topic.name.clone()));
        }
        if topic.partitions <= 0 {
            return Err(ValidationError::InvalidTopicSetting {
                topic: topic.name.clone(),
                field: "partitions",
                value: topic.partitions,
            });
        }
        if topic.replication_factor <= 0 {
            return Err(ValidationError::InvalidTopicSetting {
                topic: topic.name.clone(),
                field: "replication factor",
                value: topic.replication_factor,
            });
        }
    }

    Ok(())
}
