use async_trait::async_trait;

use crate::backend::AggregationBackend;
use crate::error::Result;
use crate::metrics::types::*;
use crate::metrics::{compute_standard, MetricPair, MetricRule};
use crate::params::ParameterContext;

static DESCRIPTOR: MetricRuleDescriptor = MetricRuleDescriptor {
    id: "time_to_merge",
    label: "Time to merge",
    description: "Time from opening a pull request to merging it",
    category: CATEGORY_DELIVERY,
    unit: Unit::Seconds,
    graph_type: GraphType::Line,
    dimension: Dimension::TimeToMerge,
    operation: Operation::Median,
    peer_policy: PeerPolicy::WhenSupplied,
    icon: Some(Icon {
        identifier: "clock",
        color: "#2563eb",
    }),
};

/// Open-to-merge duration of merged PRs, median by default.
pub struct TimeToMerge {
    descriptor: MetricRuleDescriptor,
}

impl TimeToMerge {
    pub fn new(operation: Operation) -> Self {
        Self {
            descriptor: MetricRuleDescriptor {
                operation,
                ..DESCRIPTOR.clone()
            },
        }
    }
}

impl Default for TimeToMerge {
    fn default() -> Self {
        Self::new(DESCRIPTOR.operation)
    }
}

#[async_trait]
impl MetricRule for TimeToMerge {
    fn descriptor(&self) -> &MetricRuleDescriptor {
        &self.descriptor
    }

    async fn calculate(
        &self,
        backend: &dyn AggregationBackend,
        params: &ParameterContext,
    ) -> Result<MetricPair> {
        compute_standard(self, backend, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{sample_params, CallKind, StubBackend};

    #[tokio::test]
    async fn test_median_by_default() {
        let backend = StubBackend::new()
            .with_scalar(Dimension::TimeToMerge, 7200.0)
            .with_series(Dimension::TimeToMerge, &[("2025-01-06", 3600.0)]);

        let (snapshot, graph) = TimeToMerge::default()
            .calculate(&backend, &sample_params(false))
            .await
            .unwrap();

        assert_eq!(snapshot.value, 7200.0);
        assert_eq!(snapshot.peers_value, 0.0);
        assert_eq!(snapshot.unit, Unit::Seconds);
        assert_eq!(snapshot.icon_identifier.as_deref(), Some("clock"));
        assert_eq!(graph.graph_type, GraphType::Line);
        assert_eq!(graph.time_series[0].data[0].key, "Time to merge");

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.operation == Some(Operation::Median)));
    }

    #[tokio::test]
    async fn test_configured_operation_reaches_backend() {
        let backend = StubBackend::new();
        let rule = TimeToMerge::new(Operation::Avg);
        assert_eq!(rule.operation(), Operation::Avg);

        rule.calculate(&backend, &sample_params(true)).await.unwrap();
        let subject_ops: Vec<Option<Operation>> = backend
            .calls()
            .iter()
            .filter(|c| c.kind == CallKind::Scalar || c.kind == CallKind::Series)
            .map(|c| c.operation)
            .collect();
        assert_eq!(subject_ops, vec![Some(Operation::Avg), Some(Operation::Avg)]);
    }

    #[tokio::test]
    async fn test_peer_median_overlay() {
        let backend = StubBackend::new()
            .with_scalar(Dimension::TimeToMerge, 5400.0)
            .with_peer_scalar(Dimension::TimeToMerge, 9000.0)
            .with_series(Dimension::TimeToMerge, &[("2025-01-06", 5400.0)])
            .with_peer_series(Dimension::TimeToMerge, &[("2025-01-06", 9000.0)]);

        let (snapshot, graph) = TimeToMerge::default()
            .calculate(&backend, &sample_params(true))
            .await
            .unwrap();

        assert_eq!(snapshot.peers_value, 9000.0);
        assert_eq!(graph.time_series[0].data.len(), 2);
        assert_eq!(graph.time_series[0].data[1].value, 9000.0);
    }
}
