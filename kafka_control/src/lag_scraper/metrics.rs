use anyhow::Context;
use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

pub const CONSUMER_LAG_METRIC: &str = "kafka_consumer_lag";

/// Lag gauges in a registry of their own, nothing process-global.
pub struct LagMetrics {
    registry: Registry,
    consumer_lag: IntGaugeVec,
}

impl LagMetrics {
    pub fn new() -> Result<Self, anyhow::Error> {
        let registry = Registry::new();
        let consumer_lag = IntGaugeVec::new(
            Opts::new(
                CONSUMER_LAG_METRIC,
                "Current consumer lag for a consumer group, topic and partition",
            ),
            &["topic", "partition", "group"],
        )
        .context("While creating consumer lag gauge")?;
        registry
            .register(Box::new(consumer_lag.clone()))
            .context("While registering consumer lag gauge")?;

        Ok(Self {
            registry,
            consumer_lag,
        })
    }

    pub fn set_lag(&self, topic: &str, partition: i32, group: &str, lag: i64) {
        self.consumer_lag
            .with_label_values(&[topic, &partition.to_string(), group])
            .set(lag)
    }

    /// Last published lag, `None` when nothing was published for the labels yet.
    pub fn lag(&self, topic: &str, partition: i32, group: &str) -> Option<i64> {
        let partition = partition.to_string();
        let expected = [("topic", topic), ("partition", partition.as_str()), ("group", group)];

        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == CONSUMER_LAG_METRIC)
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                expected.iter().all(|(name, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|label| label.get_name() == *name && label.get_value() == *value)
                })
            })
            .map(|metric| metric.get_gauge().get_value() as i64)
    }

    /// Prometheus text exposition of every gauge.
    pub fn render(&self) -> Result<String, anyhow::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = vec![];
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .context("While encoding metrics")?;

        String::from_utf8(buffer).context("Encoded metrics aren't valid utf-8")
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_owned()
    }
}
