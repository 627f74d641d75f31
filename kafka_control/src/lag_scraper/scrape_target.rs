use crate::error::ScrapeTargetError;
use crate::models::ClusterMetadata;
use getset::Getters;
use rand::Rng;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::warn;

/// Which consumer groups and topics to watch and how often.
#[derive(Debug, Clone, Getters)]
#[getset(get = "pub")]
pub struct ScrapeTarget {
    groups: BTreeSet<String>,
    topics: BTreeSet<String>,
    min_interval: Duration,
    max_interval: Duration,
    metadata_refresh_interval: Duration,
}

impl ScrapeTarget {
    pub fn new(
        groups: impl IntoIterator<Item = String>,
        topics: impl IntoIterator<Item = String>,
        min_interval: Duration,
        max_interval: Duration,
        metadata_refresh_interval: Duration,
    ) -> Result<Self, ScrapeTargetError> {
        if min_interval > max_interval {
            return Err(ScrapeTargetError::InvalidInterval {
                min: min_interval,
                max: max_interval,
            });
        }
        if metadata_refresh_interval.is_zero() {
            return Err(ScrapeTargetError::ZeroRefreshInterval);
        }

        let groups = groups.into_iter().collect::<BTreeSet<_>>();
        let topics = topics.into_iter().collect::<BTreeSet<_>>();
        if groups.is_empty() {
            warn!("No consumer groups configured, there will be nothing to scrape");
        }
        if topics.is_empty() {
            warn!("No topics configured, there will be nothing to scrape");
        }

        Ok(Self {
            groups,
            topics,
            min_interval,
            max_interval,
            metadata_refresh_interval,
        })
    }

    /// Uniformly distributed in `[min_interval, max_interval]`.
    pub fn next_poll_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_interval <= self.min_interval {
            return self.min_interval;
        }

        rng.gen_range(self.min_interval..=self.max_interval)
    }
}

/// Configured groups and topics that exist on the cluster right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub groups: Vec<String>,
    /// Topic names with their partition ids.
    pub topics: Vec<(String, Vec<i32>)>,
}

pub fn resolve_targets(
    target: &ScrapeTarget,
    existing_groups: &[String],
    metadata: &ClusterMetadata,
) -> Result<ResolvedTargets, ScrapeTargetError> {
    // Sorted by name, the configured set is ordered.
    let topics = target
        .topics
        .iter()
        .filter_map(|name| metadata.topic(name))
        .map(|topic| (topic.name.clone(), topic.partition_ids()))
        .collect::<Vec<_>>();
    if topics.is_empty() {
        return Err(ScrapeTargetError::TopicsMismatch(
            target.topics.iter().cloned().collect(),
        ));
    }

    let groups = existing_groups
        .iter()
        .filter(|group| target.groups.contains(*group))
        .cloned()
        .collect::<BTreeSet<_>>();
    if groups.is_empty() {
        return Err(ScrapeTargetError::GroupsMismatch(
            target.groups.iter().cloned().collect(),
        ));
    }

    Ok(ResolvedTargets {
        groups: groups.into_iter().collect(),
        topics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PartitionMetadata, TopicMetadata};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn target(min: u64, max: u64) -> ScrapeTarget {
        ScrapeTarget::new(
            ["billing".to_owned(), "audit".to_owned()],
            ["payments".to_owned()],
            Duration::from_secs(min),
            Duration::from_secs(max),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    fn metadata(topics: &[&str]) -> ClusterMetadata {
        ClusterMetadata {
            brokers: vec![],
            topics: topics
                .iter()
                .map(|name| TopicMetadata {
                    name: name.to_string(),
                    partitions: (0..2)
                        .map(|id| PartitionMetadata {
                            id,
                            leader: 1,
                            replicas: vec![1],
                            isr: vec![1],
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn poll_delay_stays_within_bounds() {
        let target = target(5, 10);
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..1000 {
            let delay = target.next_poll_delay(&mut rng);
            assert!(delay >= Duration::from_secs(5) && delay <= Duration::from_secs(10));
        }
    }

    #[test]
    fn equal_bounds_give_fixed_delay() {
        let target = target(3, 3);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(target.next_poll_delay(&mut rng), Duration::from_secs(3));
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let result = ScrapeTarget::new(
            ["billing".to_owned()],
            ["payments".to_owned()],
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(60),
        );

        assert!(matches!(
            result,
            Err(ScrapeTargetError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn only_existing_targets_are_resolved() {
        let groups = vec!["billing".to_owned(), "other".to_owned()];

        let resolved =
            resolve_targets(&target(1, 2), &groups, &metadata(&["payments", "orders"])).unwrap();

        assert_eq!(resolved.groups, vec!["billing".to_owned()]);
        assert_eq!(resolved.topics, vec![("payments".to_owned(), vec![0, 1])]);
    }

    #[test]
    fn missing_topics_or_groups_are_fatal() {
        let groups = vec!["billing".to_owned()];

        assert!(matches!(
            resolve_targets(&target(1, 2), &groups, &metadata(&["orders"])),
            Err(ScrapeTargetError::TopicsMismatch(_))
        ));
        assert!(matches!(
            resolve_targets(&target(1, 2), &[], &metadata(&["payments"])),
            Err(ScrapeTargetError::GroupsMismatch(_))
        ));
    }

    #[test]
    fn configured_topics_are_looked_up_in_name_order() {
        let target = ScrapeTarget::new(
            ["billing".to_owned()],
            ["refunds".to_owned(), "payments".to_owned(), "gone".to_owned()],
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(60),
        )
        .unwrap();
        let metadata = metadata(&["refunds", "orders", "payments"]);

        let resolved = resolve_targets(&target, &["billing".to_owned()], &metadata).unwrap();

        assert_eq!(
            resolved.topics,
            vec![
                ("payments".to_owned(), vec![0, 1]),
                ("refunds".to_owned(), vec![0, 1]),
            ]
        );
        assert_eq!(metadata.topic("orders").map(|topic| topic.partitions.len()), Some(2));
        assert!(metadata.topic("gone").is_none());
    }
}
