use crate::connection_settings::KafkaConnectionSettings;
use anyhow::Context;
use rdkafka::admin::{AdminClient, AdminOptions};
use rdkafka::client::DefaultClientContext;
use rdkafka::ClientConfig;
use std::ops::Deref;
use std::time::Duration;

pub struct AdminWrapper {
    client: AdminClient<DefaultClientContext>,
    operation_timeout: Duration,
}

impl AdminWrapper {
    pub fn create(connection_settings: &KafkaConnectionSettings) -> Result<Self, anyhow::Error> {
        let mut config = ClientConfig::try_from(connection_settings)?;

        // https://raw.githubusercontent.com/confluentinc/librdkafka/master/CONFIGURATION.md
        let client: AdminClient<DefaultClientContext> = config
            .set("message.max.bytes", "1000000000")
            .set("receive.message.max.bytes", "2147483647")
            .create()
            .context("While creating kafka AdminClient")?;

        Ok(Self {
            client,
            operation_timeout: connection_settings.operation_timeout,
        })
    }

    pub fn options(&self) -> AdminOptions {
        AdminOptions::new()
            .request_timeout(Some(self.operation_timeout))
            .operation_timeout(Some(self.operation_timeout))
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }
}

impl Deref for AdminWrapper {
    type Target = AdminClient<DefaultClientContext>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
