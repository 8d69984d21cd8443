use async_trait::async_trait;

use crate::backend::AggregationBackend;
use crate::error::Result;
use crate::metrics::types::*;
use crate::metrics::{compute_standard, MetricPair, MetricRule};
use crate::params::ParameterContext;

static DESCRIPTOR: MetricRuleDescriptor = MetricRuleDescriptor {
    id: "loc_removed",
    label: "Lines removed",
    description: "Lines removed across merged pull requests",
    category: CATEGORY_CODE_VOLUME,
    unit: Unit::Lines,
    graph_type: GraphType::Bar,
    dimension: Dimension::LocRemoved,
    operation: Operation::Sum,
    peer_policy: PeerPolicy::WhenSupplied,
    icon: Some(Icon {
        identifier: "minus-square",
        color: "#dc2626",
    }),
};

pub struct LocRemoved;

#[async_trait]
impl MetricRule for LocRemoved {
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
