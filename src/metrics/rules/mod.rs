//! The registered metric rules. Adding a metric means adding a file here and
//! one line to [`default_rules`].

mod loc_added;
mod loc_removed;
mod prs_merged;
mod prs_reviewed;
mod review_complexity;
mod time_to_merge;

pub use loc_added::LocAdded;
pub use loc_removed::LocRemoved;
pub use prs_merged::PrsMerged;
pub use prs_reviewed::PrsReviewed;
pub use review_complexity::ReviewComplexity;
pub use time_to_merge::TimeToMerge;

use super::engine::EngineConfig;
use super::MetricRule;

/// The standard registry, in reporting order.
pub fn default_rules(config: &EngineConfig) -> Vec<Box<dyn MetricRule>> {
    vec![
        Box::new(TimeToMerge::new(config.time_to_merge_operation)),
        Box::new(PrsMerged),
        Box::new(PrsReviewed),
        Box::new(LocAdded),
        Box::new(LocRemoved),
        Box::new(ReviewComplexity::new(config.review_complexity_peer_policy)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{sample_params, StubBackend};
    use crate::metrics::types::{Dimension, PeerPolicy, TimeSeriesEntry};

    #[test]
    fn test_default_registry_order_and_uniqueness() {
        let rules = default_rules(&EngineConfig::default());
        let dims: Vec<Dimension> = rules.iter().map(|r| r.descriptor().dimension).collect();
        assert_eq!(
            dims,
            vec![
                Dimension::TimeToMerge,
                Dimension::PrsMerged,
                Dimension::PrsReviewed,
                Dimension::LocAdded,
                Dimension::LocRemoved,
                Dimension::ReviewComplexity,
            ]
        );
        let mut ids: Vec<&str> = rules.iter().map(|r| r.descriptor().id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), rules.len());
    }

    #[tokio::test]
    async fn test_without_peers_graph_is_raw_subject_series() {
        let rules = default_rules(&EngineConfig::default());
        let when_supplied: Vec<_> = rules
            .iter()
            .filter(|r| r.peer_policy() == PeerPolicy::WhenSupplied)
            .collect();
        assert_eq!(when_supplied.len(), 5);

        for rule in when_supplied {
            let desc = rule.descriptor();
            let backend = StubBackend::new()
                .with_scalar(desc.dimension, 7.0)
                .with_peer_scalar(desc.dimension, 3.0)
                .with_series(desc.dimension, &[("2025-01-06", 4.0), ("2025-01-20", 3.0)])
                .with_peer_series(desc.dimension, &[("2025-01-06", 1.5)]);

            let (snapshot, graph) = rule.calculate(&backend, &sample_params(false)).await.unwrap();

            assert_eq!(snapshot.value, 7.0, "{}", desc.id);
            assert_eq!(snapshot.peers_value, 0.0, "{}", desc.id);
            assert_eq!(backend.peer_call_count(), 0, "{}", desc.id);
            assert_eq!(
                graph.time_series,
                vec![
                    TimeSeriesEntry::single("2025-01-06", desc.label, 4.0),
                    TimeSeriesEntry::single("2025-01-20", desc.label, 3.0),
                ],
                "{}",
                desc.id
            );
        }
    }
}
