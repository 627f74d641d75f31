use anyhow::Context;
use config::Config;
use kafka_control::codec::{AvroCodec, SchemaRegistry};
use kafka_control::connection_settings::{KafkaConnectionSettings, TlsSettings};
use kafka_control::queries::read_messages::{Format, ReadMessagesQueryInternal, ReadMode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_TAIL_COUNT: i64 = 10;

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    pub kafka: KafkaConfig,
    pub task: TaskConfig,
}

#[derive(Deserialize, Debug)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    #[serde(default = "default_security_protocol")]
    pub security_protocol: String,
    pub tls: Option<TlsConfig>,
    pub operation_timeout_secs: Option<u64>,
    pub schema_registry: Option<SchemaRegistryConfig>,
}

#[derive(Deserialize, Debug)]
pub struct TlsConfig {
    pub ca_location: Option<String>,
    pub certificate_location: Option<String>,
    pub key_location: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SchemaRegistryConfig {
    pub url: String,
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
}

/// The single operation a run performs.
#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskConfig {
    ListAcls,
    SetAcls {
        file: String,
        #[serde(default)]
        apply: bool,
    },
    ListTopics {
        #[serde(default)]
        include_internal: bool,
    },
    SetTopics {
        file: String,
        #[serde(default)]
        apply: bool,
        #[serde(default)]
        include_deletion: bool,
    },
    Consume(ConsumeConfig),
    Produce(ProduceConfig),
    Status,
    ConsumerLag(ConsumerLagConfig),
    RegistrySubjects,
    RegistrySchema {
        subject: String,
    },
}

#[derive(Deserialize, Debug)]
pub struct ConsumeConfig {
    pub topic: String,
    #[serde(default)]
    pub partitions: Vec<i32>,
    #[serde(default)]
    pub format: Format,
    #[serde(default)]
    pub decode: bool,
    pub count: Option<i64>,
    #[serde(default)]
    pub follow: bool,
    /// Setting `from` switches to reading a time range.
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct ProduceConfig {
    pub topic: String,
    pub key: Option<String>,
    pub value: String,
    #[serde(default)]
    pub value_format: Format,
    pub schema_id: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct ConsumerLagConfig {
    pub groups: Vec<String>,
    pub topics: Vec<String>,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    #[serde(default = "default_metadata_refresh_secs")]
    pub metadata_refresh_interval_secs: u64,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

fn default_security_protocol() -> String {
    "plaintext".to_owned()
}

fn default_registry_timeout_secs() -> u64 {
    10
}

fn default_metadata_refresh_secs() -> u64 {
    60
}

fn default_listen_address() -> String {
    "0.0.0.0:9090".to_owned()
}

impl AppConfig {
    pub fn build() -> Result<Self, anyhow::Error> {
        let config = Config::builder()
            .add_source(config::File::with_name("appsettings").required(false))
            .add_source(
                config::Environment::with_prefix("App")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("kafka.brokers")
                    .with_list_parse_key("task.partitions")
                    .with_list_parse_key("task.groups")
                    .with_list_parse_key("task.topics"),
            )
            .build()
            .context("While building config")?;

        let deserialized_config = config
            .try_deserialize()
            .context("While deserializing config")?;

        info!("App config: {deserialized_config:?}");

        Ok(deserialized_config)
    }
}

impl KafkaConfig {
    pub fn connection_settings(&self) -> Result<KafkaConnectionSettings, anyhow::Error> {
        let mut settings = KafkaConnectionSettings::plaintext(self.brokers.clone());
        settings.security_protocol = self
            .security_protocol
            .parse()
            .context("While parsing security protocol")?;
        settings.tls = self.tls.as_ref().map(|tls| TlsSettings {
            ca_location: tls.ca_location.clone(),
            certificate_location: tls.certificate_location.clone(),
            key_location: tls.key_location.clone(),
        });
        if let Some(secs) = self.operation_timeout_secs {
            settings.operation_timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    pub fn schema_registry(&self) -> Result<Option<Arc<SchemaRegistry>>, anyhow::Error> {
        let Some(registry) = &self.schema_registry else {
            return Ok(None);
        };

        let registry = SchemaRegistry::new(&registry.url, Duration::from_secs(registry.timeout_secs))
            .context("While creating schema registry client")?;

        Ok(Some(Arc::new(registry)))
    }

    pub fn codec(&self) -> Result<Option<Arc<AvroCodec>>, anyhow::Error> {
        Ok(self
            .schema_registry()?
            .map(|registry| Arc::new(AvroCodec::new(registry))))
    }
}

impl ConsumeConfig {
    pub fn to_query(&self) -> ReadMessagesQueryInternal {
        let mode = match self.from {
            Some(from) => ReadMode::History {
                from,
                to: self.to,
                count: self.count,
            },
            None => ReadMode::Tail {
                count: self.count.unwrap_or(DEFAULT_TAIL_COUNT),
                follow: self.follow,
            },
        };

        ReadMessagesQueryInternal {
            topic: self.topic.clone(),
            partitions: self.partitions.clone(),
            mode,
            format: self.format,
            decode: self.decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> AppConfig {
        Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn lag_task_is_parsed() {
        let config = parse(
            r#"
kafka:
  brokers: ["localhost:9092"]
task:
  kind: consumer_lag
  groups: ["billing"]
  topics: ["payments"]
  min_interval_ms: 1000
  max_interval_ms: 3000
"#,
        );

        let TaskConfig::ConsumerLag(lag) = config.task else {
            panic!("unexpected task {:?}", config.task);
        };
        assert_eq!(lag.groups, vec!["billing"]);
        assert_eq!(lag.metadata_refresh_interval_secs, 60);
        assert_eq!(lag.listen_address, "0.0.0.0:9090");
    }

    #[test]
    fn consume_without_from_tails() {
        let config = parse(
            r#"
kafka:
  brokers: ["localhost:9092"]
task:
  kind: consume
  topic: payments
  format: hex
"#,
        );

        let TaskConfig::Consume(consume) = config.task else {
            panic!("unexpected task {:?}", config.task);
        };
        let query = consume.to_query();
        assert_eq!(query.format, Format::Hex);
        assert_eq!(
            query.mode,
            ReadMode::Tail {
                count: DEFAULT_TAIL_COUNT,
                follow: false
            }
        );
    }

    #[test]
    fn consume_with_from_reads_history() {
        let config = parse(
            r#"
kafka:
  brokers: ["localhost:9092"]
task:
  kind: consume
  topic: payments
  from: "2024-05-01T00:00:00Z"
  count: 5
"#,
        );

        let TaskConfig::Consume(consume) = config.task else {
            panic!("unexpected task {:?}", config.task);
        };
        assert!(matches!(
            consume.to_query().mode,
            ReadMode::History {
                to: None,
                count: Some(5),
                ..
            }
        ));
    }

    #[test]
    fn tls_settings_are_carried_over() {
        let config = parse(
            r#"
kafka:
  brokers: ["broker-1:9093", "broker-2:9093"]
  security_protocol: SSL
  operation_timeout_secs: 5
  tls:
    ca_location: /etc/kafka/ca.pem
task:
  kind: status
"#,
        );

        let settings = config.kafka.connection_settings().unwrap();

        assert_eq!(settings.brokers.len(), 2);
        assert_eq!(settings.operation_timeout, Duration::from_secs(5));
        assert_eq!(
            settings.tls.and_then(|tls| tls.ca_location).as_deref(),
            Some("/etc/kafka/ca.pem")
        );
    }

    #[test]
    fn registry_schema_task_carries_subject() {
        let config = parse(
            r#"
kafka:
  brokers: ["localhost:9092"]
  schema_registry:
    url: "http://registry:8081"
task:
  kind: registry_schema
  subject: payments-value
"#,
        );

        let TaskConfig::RegistrySchema { subject } = &config.task else {
            panic!("unexpected task {:?}", config.task);
        };
        assert_eq!(subject, "payments-value");
        assert!(config.kafka.schema_registry().unwrap().is_some());
    }

    #[test]
    fn registry_is_absent_without_url() {
        let config = parse(
            r#"
kafka:
  brokers: ["localhost:9092"]
task:
  kind: registry_subjects
"#,
        );

        assert!(matches!(config.task, TaskConfig::RegistrySubjects));
        assert!(config.kafka.schema_registry().unwrap().is_none());
    }
}
