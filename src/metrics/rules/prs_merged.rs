use async_trait::async_trait;

use crate::backend::AggregationBackend;
use crate::error::Result;
use crate::metrics::types::*;
use crate::metrics::{compute_standard, MetricPair, MetricRule};
use crate::params::ParameterContext;

static DESCRIPTOR: MetricRuleDescriptor = MetricRuleDescriptor {
    id: "prs_merged",
    label: "PRs merged",
    description: "Pull requests authored and merged in the period",
    category: CATEGORY_DELIVERY,
    unit: Unit::Count,
    graph_type: GraphType::Bar,
    dimension: Dimension::PrsMerged,
    operation: Operation::Count,
    peer_policy: PeerPolicy::WhenSupplied,
    icon: Some(Icon {
        identifier: "git-merge",
        color: "#7c3aed",
    }),
};

pub struct PrsMerged;

#[async_trait]
impl MetricRule for PrsMerged {
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
