use crate::cluster::KafkaCluster;
use crate::lag_scraper::{fetch_group_topic_lags, resolve_targets, LagMetrics, ResolvedTargets, ScrapeTarget};
use crate::models::ClusterMetadata;
use anyhow::Context;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::select;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, warn, Instrument};

/// Periodically publishes the lag of configured consumer groups on configured topics.
pub struct LagScraper {
    cluster: Arc<dyn KafkaCluster>,
    target: Arc<ScrapeTarget>,
    metrics: Arc<LagMetrics>,
    rng: StdRng,
}

impl LagScraper {
    pub fn new(
        cluster: Arc<dyn KafkaCluster>,
        target: ScrapeTarget,
        rng: StdRng,
    ) -> Result<Self, anyhow::Error> {
        Ok(Self {
            cluster,
            target: Arc::new(target),
            metrics: Arc::new(LagMetrics::new()?),
            rng,
        })
    }

    pub fn metrics(&self) -> Arc<LagMetrics> {
        self.metrics.clone()
    }

    /// Runs until `shutdown` is cancelled. Returns only after every spawned task finished,
    /// so nothing touches the metrics afterwards. Failing to resolve targets at startup is fatal.
    #[tracing::instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), anyhow::Error> {
        let metadata = self
            .cluster
            .fetch_metadata()
            .await
            .context("While fetching initial cluster metadata")?;
        let groups = self
            .cluster
            .list_consumer_groups()
            .await
            .context("While listing consumer groups")?;
        let resolved = resolve_targets(&self.target, &groups, &metadata)?;
        info!(
            "Scraping lag of groups {:?} on topics {:?}",
            resolved.groups,
            resolved
                .topics
                .iter()
                .map(|(topic, _)| topic.as_str())
                .collect::<Vec<_>>()
        );

        let metadata = Arc::new(RwLock::new(metadata));
        let tracker = TaskTracker::new();

        tracker.spawn(
            refresh_metadata(
                self.cluster.clone(),
                self.target.clone(),
                metadata.clone(),
                shutdown.clone(),
            )
            .instrument(info_span!("Refreshing metadata").or_current()),
        );
        tracker.spawn(
            poll_lags(
                self.cluster.clone(),
                self.target.clone(),
                self.metrics.clone(),
                metadata,
                self.rng,
                tracker.clone(),
                shutdown,
            )
            .instrument(info_span!("Polling lags").or_current()),
        );

        tracker.close();
        tracker.wait().await;
        info!("Consumer lag scraper stopped");

        Ok(())
    }
}

async fn refresh_metadata(
    cluster: Arc<dyn KafkaCluster>,
    target: Arc<ScrapeTarget>,
    metadata: Arc<RwLock<ClusterMetadata>>,
    shutdown: CancellationToken,
) {
    loop {
        select! {
            _ = sleep(*target.metadata_refresh_interval()) => {}
            _ = shutdown.cancelled() => {
                info!("Shutting down metadata refresher");
                return;
            }
        }

        match cluster.fetch_metadata().await {
            Ok(fresh) => {
                debug!("Refreshed metadata of {} topics", fresh.topics.len());
                *metadata.write().await = fresh;
            }
            Err(e) => warn!("Error while refreshing cluster metadata: {:?}", e),
        }
    }
}

async fn poll_lags(
    cluster: Arc<dyn KafkaCluster>,
    target: Arc<ScrapeTarget>,
    metrics: Arc<LagMetrics>,
    metadata: Arc<RwLock<ClusterMetadata>>,
    mut rng: StdRng,
    tracker: TaskTracker,
    shutdown: CancellationToken,
) {
    while !shutdown.is_cancelled() {
        match resolve_current_targets(cluster.as_ref(), &target, &metadata).await {
            Ok(resolved) => {
                for group in &resolved.groups {
                    for (topic, partitions) in &resolved.topics {
                        let future = publish_group_topic_lags(
                            cluster.clone(),
                            metrics.clone(),
                            group.clone(),
                            topic.clone(),
                            partitions.clone(),
                        )
                        .instrument(info_span!("Fetching lag", %group, %topic).or_current());
                        tracker.spawn(future);
                    }
                }
            }
            Err(e) => warn!("Skipping lag poll: {:?}", e),
        }

        let delay = target.next_poll_delay(&mut rng);
        debug!("Next lag poll in {:?}", delay);
        select! {
            _ = sleep(delay) => {}
            _ = shutdown.cancelled() => {}
        }
    }

    info!("Shutting down lag poller");
}

async fn resolve_current_targets(
    cluster: &dyn KafkaCluster,
    target: &ScrapeTarget,
    metadata: &RwLock<ClusterMetadata>,
) -> Result<ResolvedTargets, anyhow::Error> {
    let groups = cluster
        .list_consumer_groups()
        .await
        .context("While listing consumer groups")?;
    let metadata = metadata.read().await;

    Ok(resolve_targets(target, &groups, &metadata)?)
}

async fn publish_group_topic_lags(
    cluster: Arc<dyn KafkaCluster>,
    metrics: Arc<LagMetrics>,
    group: String,
    topic: String,
    partitions: Vec<i32>,
) {
    let lags = fetch_group_topic_lags(cluster.as_ref(), &group, &topic, &partitions).await;
    for lag in lags {
        metrics.set_lag(&topic, lag.partition, &group, lag.lag);
    }
}
