use crate::app_config::{
    AppConfig, ConsumeConfig, ConsumerLagConfig, KafkaConfig, ProduceConfig, TaskConfig,
};
use crate::desired_state::{load_acls_file, load_topics_file};
use crate::metrics_server::serve_metrics;
use crate::shutdown::shutdown_on_signal;
use anyhow::Context;
use kafka_control::cluster::{KafkaCluster, RdKafkaCluster};
use kafka_control::codec::{AvroCodec, SchemaRegistry};
use kafka_control::commands::produce_messages::{produce_message, ProduceMessageCommandInternal};
use kafka_control::commands::set_acls::apply_acls_diff;
use kafka_control::commands::set_topics::apply_topics_diff;
use kafka_control::lag_scraper::{LagScraper, ScrapeTarget};
use kafka_control::models::{AclsFile, TopicsFile};
use kafka_control::queries::get_acls::get_acls;
use kafka_control::queries::get_acls_diff::get_acls_diff;
use kafka_control::queries::get_cluster_status::get_cluster_status;
use kafka_control::queries::get_schemas::{get_subject_schema, get_subjects};
use kafka_control::queries::get_topics::get_topics;
use kafka_control::queries::get_topics_diff::get_topics_diff;
use kafka_control::queries::read_messages::{read_history, run_read_messages_to_channel, ReadMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

pub async fn run_until_stopped(config: AppConfig) -> Result<(), anyhow::Error> {
    let connection_settings = config.kafka.connection_settings()?;
    let codec = config.kafka.codec()?;
    let cluster: Arc<dyn KafkaCluster> = Arc::new(
        RdKafkaCluster::connect(connection_settings).context("While connecting to kafka")?,
    );
    let shutdown = shutdown_on_signal();

    match config.task {
        TaskConfig::ListAcls => {
            let acls = get_acls(cluster.as_ref()).await?;
            print_json(&AclsFile::from_resource_acls(&acls))?;
        }
        TaskConfig::SetAcls { file, apply } => {
            let desired = load_acls_file(&file)?;
            let diff = get_acls_diff(cluster.as_ref(), &desired).await?;
            print_json(&diff)?;

            if diff.is_empty() {
                info!("ACLs are up to date");
            } else if apply {
                apply_acls_diff(cluster.as_ref(), &diff).await?;
            } else {
                info!("Dry run, nothing was changed. Set apply to change ACLs");
            }
        }
        TaskConfig::ListTopics { include_internal } => {
            let topics = get_topics(cluster.as_ref(), include_internal).await?;
            print_json(&TopicsFile { topics })?;
        }
        TaskConfig::SetTopics {
            file,
            apply,
            include_deletion,
        } => {
            let desired = load_topics_file(&file)?;
            let mut diff = get_topics_diff(cluster.as_ref(), &desired).await?;
            if !include_deletion && !diff.to_delete.is_empty() {
                warn!(
                    "Skipping deletion of {} topics, set include_deletion to delete them",
                    diff.to_delete.len()
                );
                diff.to_delete.clear();
            }
            print_json(&diff)?;

            if diff.is_empty() {
                info!("Topics are up to date");
            } else if apply {
                apply_topics_diff(cluster.as_ref(), &diff).await?;
            } else {
                info!("Dry run, nothing was changed. Set apply to change topics");
            }
        }
        TaskConfig::Consume(consume) => consume_messages(cluster, codec, consume, shutdown).await?,
        TaskConfig::Produce(produce) => produce_one(cluster.as_ref(), codec, produce).await?,
        TaskConfig::Status => {
            let statuses = get_cluster_status(cluster.as_ref()).await?;
            print_json(&statuses)?;
        }
        TaskConfig::ConsumerLag(lag) => scrape_consumer_lag(cluster, lag, shutdown).await?,
        TaskConfig::RegistrySubjects => {
            let registry = require_registry(&config.kafka)?;
            print_json(&get_subjects(registry.as_ref()).await?)?;
        }
        TaskConfig::RegistrySchema { subject } => {
            let registry = require_registry(&config.kafka)?;
            print_json(&get_subject_schema(registry.as_ref(), &subject).await?)?;
        }
    }

    Ok(())
}

fn require_registry(kafka: &KafkaConfig) -> Result<Arc<SchemaRegistry>, anyhow::Error> {
    kafka
        .schema_registry()?
        .context("Schema registry url is not configured")
}

fn print_json<T: Serialize>(value: &T) -> Result<(), anyhow::Error> {
    let json = serde_json::to_string_pretty(value).context("While serializing output")?;
    println!("{}", json);
    Ok(())
}

async fn consume_messages(
    cluster: Arc<dyn KafkaCluster>,
    codec: Option<Arc<AvroCodec>>,
    consume: ConsumeConfig,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let query = consume.to_query();

    if let ReadMode::History { .. } = query.mode {
        let messages = select! {
            messages = read_history(cluster, query, codec) => messages?,
            _ = shutdown.cancelled() => {
                info!("Stopped before the time range was read");
                return Ok(());
            }
        };
        for message in &messages {
            println!("{}", serde_json::to_string(message).context("While serializing message")?);
        }
        return Ok(());
    }

    let mut receiver = run_read_messages_to_channel(cluster, query, codec).await?;
    let mut stopping = false;
    loop {
        select! {
            message = receiver.next() => match message? {
                Some(message) => {
                    println!("{}", serde_json::to_string(&message).context("While serializing message")?);
                }
                None => break,
            },
            _ = shutdown.cancelled(), if !stopping => {
                info!("Stopping {} partition readers", receiver.active_readers());
                stopping = true;
                receiver.stop();
            }
        }
    }

    Ok(())
}

async fn produce_one(
    cluster: &dyn KafkaCluster,
    codec: Option<Arc<AvroCodec>>,
    produce: ProduceConfig,
) -> Result<(), anyhow::Error> {
    let command = ProduceMessageCommandInternal {
        topic: produce.topic,
        key: produce.key,
        value: produce.value,
        value_format: produce.value_format,
        schema_id: produce.schema_id,
    };

    let partition_offset = produce_message(cluster, codec.as_deref(), &command).await?;
    print_json(&partition_offset)
}

async fn scrape_consumer_lag(
    cluster: Arc<dyn KafkaCluster>,
    lag: ConsumerLagConfig,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    let target = ScrapeTarget::new(
        lag.groups,
        lag.topics,
        Duration::from_millis(lag.min_interval_ms),
        Duration::from_millis(lag.max_interval_ms),
        Duration::from_secs(lag.metadata_refresh_interval_secs),
    )
    .context("While validating consumer lag settings")?;
    let scraper = LagScraper::new(cluster, target, StdRng::from_entropy())?;

    let listener = TcpListener::bind(&lag.listen_address)
        .await
        .with_context(|| format!("While binding {}", lag.listen_address))?;
    let server_shutdown = CancellationToken::new();
    let server = tokio::spawn(
        serve_metrics(listener, scraper.metrics(), server_shutdown.clone())
            .instrument(info_span!("Metrics server").or_current()),
    );

    let result = scraper.run(shutdown).await;

    server_shutdown.cancel();
    server.await.context("While waiting for metrics server")??;

    result
}
