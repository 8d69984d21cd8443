use async_trait::async_trait;

use crate::backend::AggregationBackend;
use crate::error::Result;
use crate::metrics::types::*;
use crate::metrics::{compute_standard, MetricPair, MetricRule};
use crate::params::ParameterContext;

static DESCRIPTOR: MetricRuleDescriptor = MetricRuleDescriptor {
    id: "loc_added",
    label: "Lines added",
    description: "Lines added across merged pull requests",
    category: CATEGORY_CODE_VOLUME,
    unit: Unit::Lines,
    graph_type: GraphType::Bar,
    dimension: Dimension::LocAdded,
    operation: Operation::Sum,
    peer_policy: PeerPolicy::WhenSupplied,
    icon: Some(Icon {
        identifier: "plus-square",
        color: "#16a34a",
    }),
};

pub struct LocAdded;

#[async_trait]
impl MetricRule for LocAdded {
    fn descriptor(&self) -> &MetricRuleDescriptor {
        &DESCRIPTOR
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
    use crate::metrics::testing::{sample_params, StubBackend};

    #[tokio::test]
    async fn test_sums_lines_with_peer_overlay() {
        let backend = StubBackend::new()
            .with_scalar(Dimension::LocAdded, 1250.0)
            .with_peer_scalar(Dimension::LocAdded, 800.0)
            .with_series(Dimension::LocAdded, &[("2025-01", 1250.0)])
            .with_peer_series(Dimension::LocAdded, &[("2025-01", 800.0)]);

        let (snapshot, graph) = LocAdded.calculate(&backend, &sample_params(true)).await.unwrap();
        assert_eq!(snapshot.value, 1250.0);
        assert_eq!(snapshot.peers_value, 800.0);
        assert_eq!(snapshot.unit, Unit::Lines);
        assert_eq!(graph.time_series[0].data.len(), 2);
        assert!(backend
            .calls()
            .iter()
            .filter_map(|c| c.operation)
            .all(|op| op == Operation::Sum));
    }
}
