use async_trait::async_trait;

use crate::backend::AggregationBackend;
use crate::error::Result;
use crate::metrics::types::*;
use crate::metrics::{compute_standard, MetricPair, MetricRule};
use crate::params::ParameterContext;

static DESCRIPTOR: MetricRuleDescriptor = MetricRuleDescriptor {
    id: "prs_reviewed",
    label: "PRs reviewed",
    description: "Other people's pull requests reviewed in the period",
    category: CATEGORY_COLLABORATION,
    unit: Unit::Count,
    graph_type: GraphType::Bar,
    dimension: Dimension::PrsReviewed,
    operation: Operation::Count,
    peer_policy: PeerPolicy::WhenSupplied,
    icon: Some(Icon {
        identifier: "eye",
        color: "#0891b2",
    }),
};

pub struct PrsReviewed;

#[async_trait]
impl MetricRule for PrsReviewed {
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
    use crate::metrics::testing::{sample_params, sample_payload, StubBackend};
    use serde_json::json;

    #[tokio::test]
    async fn test_counts_reviews() {
        let backend = StubBackend::new()
            .with_scalar(Dimension::PrsReviewed, 8.0)
            .with_peer_scalar(Dimension::PrsReviewed, 4.5);
        let (snapshot, graph) = PrsReviewed.calculate(&backend, &sample_params(true)).await.unwrap();
        assert_eq!(snapshot.value, 8.0);
        assert_eq!(snapshot.peers_value, 4.5);
        assert!(graph.time_series.is_empty());
        assert_eq!(PrsReviewed.category().name, "Collaboration");
    }

    #[tokio::test]
    async fn test_invalid_interval_issues_no_calls() {
        let backend = StubBackend::new();
        let mut payload = sample_payload(true);
        payload["interval"] = json!("yearly");

        let err = PrsReviewed.calculate_payload(&backend, &payload).await.unwrap_err();
        assert!(err.is_invalid_request());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_peer_list_is_no_peers() {
        let backend = StubBackend::new().with_peer_scalar(Dimension::PrsReviewed, 9.0);
        let mut payload = sample_payload(false);
        payload["metric_params"]["peersSourceControlAccountIDs"] = json!([]);

        let (snapshot, _) = PrsReviewed.calculate_payload(&backend, &payload).await.unwrap();
        assert_eq!(snapshot.peers_value, 0.0);
        assert_eq!(backend.peer_call_count(), 0);
    }
}
