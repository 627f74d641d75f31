use crate::connection_settings::KafkaConnectionSettings;
use anyhow::Context;
use rdkafka::producer::FutureProducer;
use rdkafka::ClientConfig;
use std::ops::Deref;

pub struct ProducerWrapper {
    producer: FutureProducer,
}

impl ProducerWrapper {
    pub fn create(connection_settings: &KafkaConnectionSettings) -> Result<Self, anyhow::Error> {
        let mut config = ClientConfig::try_from(connection_settings)?;
        let producer: FutureProducer = config
            .set(
                "message.timeout.ms",
                connection_settings
                    .operation_timeout
                    .as_millis()
                    .to_string(),
            )
            .set("linger.ms", "0")
            .create()
            .context("While creating a kafka FutureProducer")?;

        Ok(Self { producer })
    }
}

impl Deref for ProducerWrapper {
    type Target = FutureProducer;

    fn deref(&self) -> &Self::Target {
        &self.producer
    }
}
