use crate::consumer::SecurityProtocol;
use anyhow::bail;
use rdkafka::ClientConfig;
use std::time::Duration;

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct KafkaConnectionSettings {
    pub brokers: Vec<String>,
    pub security_protocol: SecurityProtocol,
    pub tls: Option<TlsSettings>,
    /// Upper bound for every admin and metadata request.
    pub operation_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    pub ca_location: Option<String>,
    pub certificate_location: Option<String>,
    pub key_location: Option<String>,
}

impl KafkaConnectionSettings {
    pub fn plaintext(brokers: Vec<String>) -> Self {
        Self {
            brokers,
            security_protocol: SecurityProtocol::Plaintext,
            tls: None,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl TryFrom<&KafkaConnectionSettings> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(value: &KafkaConnectionSettings) -> Result<Self, Self::Error> {
        if value.brokers.is_empty() {
            bail!("No brokers specified")
        }

        let mut config = ClientConfig::new();

        let brokers_string = value.brokers.join(",");
        config
            .set("bootstrap.servers", brokers_string)
            .set("security.protocol", value.security_protocol.to_string());

        if let Some(tls) = &value.tls {
            if value.security_protocol != SecurityProtocol::Ssl {
                bail!(
                    "TLS files are configured but security protocol is {}",
                    value.security_protocol
                )
            }
            if let Some(ca) = &tls.ca_location {
                config.set("ssl.ca.location", ca);
            }
            if let Some(certificate) = &tls.certificate_location {
                config.set("ssl.certificate.location", certificate);
            }
            if let Some(key) = &tls.key_location {
                config.set("ssl.key.location", key);
            }
        }

        if let Ok(value) = std::env::var("RD_KAFKA_DEBUG") {
            config.set("debug", value);
        }

        Ok(config)
    }
}
