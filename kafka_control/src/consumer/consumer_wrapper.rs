use crate::connection_settings::KafkaConnectionSettings;
use anyhow::Context;
use rdkafka::consumer::StreamConsumer;
use rdkafka::ClientConfig;
use std::ops::{Deref, DerefMut};

pub struct ConsumerWrapper {
    consumer: StreamConsumer,
}

impl ConsumerWrapper {
    /// Consumer that reads messages of manually assigned partitions.
    /// With `partition_eof` the consumer reports reaching the end of a partition as an error event.
    pub fn create_for_consuming(
        connection_settings: &KafkaConnectionSettings,
        group: &str,
        partition_eof: bool,
    ) -> Result<Self, anyhow::Error> {
        let mut config = ClientConfig::try_from(connection_settings)?;

        // https://raw.githubusercontent.com/confluentinc/librdkafka/master/CONFIGURATION.md
        let consumer: StreamConsumer = config
            .set("group.id", group)
            // An assigned offset removed by retention in the meantime restarts at the oldest one.
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", partition_eof.to_string())
            .set("session.timeout.ms", "10000")
            .set("enable.auto.commit", "false")
            .set("message.max.bytes", "1000000000")
            .set("receive.message.max.bytes", "2147483647")
            .create()
            .context("While creating kafka StreamConsumer")?;

        Ok(Self { consumer })
    }

    /// Consumer used only for metadata, watermarks and committed offsets.
    pub fn create_for_non_consuming(
        connection_settings: &KafkaConnectionSettings,
        group: Option<&str>,
    ) -> Result<Self, anyhow::Error> {
        let mut config = ClientConfig::try_from(connection_settings)?;
        if let Some(group) = group {
            config.set("group.id", group);
        }

        let consumer: StreamConsumer = config
            .set("enable.auto.commit", "false")
            .create()
            .context("While creating kafka StreamConsumer")?;

        Ok(Self { consumer })
    }
}

impl DerefMut for ConsumerWrapper {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.consumer
    }
}

impl Deref for ConsumerWrapper {
    type Target = StreamConsumer;

    fn deref(&self) -> &Self::Target {
        &self.consumer
    }
}
