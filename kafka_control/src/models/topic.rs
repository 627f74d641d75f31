use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INTERNAL_TOPIC_PREFIX: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(alias = "num_partitions")]
    pub partitions: i32,
    #[serde(alias = "replication")]
    pub replication_factor: i32,
    /// Only non-default settings.
    #[serde(default)]
    pub configs: BTreeMap<String, String>,
}

impl Topic {
    pub fn is_internal(&self) -> bool {
        is_internal_topic(&self.name)
    }
}

pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with(INTERNAL_TOPIC_PREFIX)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicsFile {
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// Changed or added settings of one existing topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlteredConfigs {
    pub topic_name: String,
    pub configs: BTreeMap<String, String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDiff {
    pub to_create: Vec<Topic>,
    pub to_delete: Vec<Topic>,
    pub to_alter: Vec<AlteredConfigs>,
}

impl TopicDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty() && self.to_alter.is_empty()
    }
}

/// One entry of a described topic configuration, as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicConfigEntry {
    pub name: String,
    pub value: Option<String>,
    pub is_default: bool,
}

pub fn non_default_configs(entries: &[TopicConfigEntry]) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter(|entry| !entry.is_default)
        .filter_map(|entry| Some((entry.name.clone(), entry.value.clone()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_and_empty_entries_are_skipped() {
        let entries = vec![
            TopicConfigEntry {
                name: "cleanup.policy".to_owned(),
                value: Some("delete".to_owned()),
                is_default: true,
            },
            TopicConfigEntry {
                name: "retention.ms".to_owned(),
                value: Some("1000".to_owned()),
                is_default: false,
            },
            TopicConfigEntry {
                name: "ssl.password".to_owned(),
                value: None,
                is_default: false,
            },
        ];

        let configs = non_default_configs(&entries);

        assert_eq!(
            configs,
            BTreeMap::from([("retention.ms".to_owned(), "1000".to_owned())])
        );
    }

    #[test]
    fn double_underscore_marks_internal_topics() {
        assert!(is_internal_topic("__consumer_offsets"));
        assert!(!is_internal_topic("_schemas"));
    }
}
