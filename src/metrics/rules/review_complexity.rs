use async_trait::async_trait;

use crate::backend::AggregationBackend;
use crate::error::Result;
use crate::metrics::types::*;
use crate::metrics::{compute_standard, MetricPair, MetricRule};
use crate::params::ParameterContext;

static DESCRIPTOR: MetricRuleDescriptor = MetricRuleDescriptor {
    id: "review_complexity",
    label: "Review complexity",
    description: "Average complexity score of pull requests reviewed",
    category: CATEGORY_COLLABORATION,
    unit: Unit::Score,
    graph_type: GraphType::Line,
    dimension: Dimension::ReviewComplexity,
    operation: Operation::Avg,
    peer_policy: PeerPolicy::Always,
    icon: Some(Icon {
        identifier: "layers",
        color: "#ea580c",
    }),
};

/// Complexity of the PRs a subject reviewed. Peer data is queried on every
/// request unless configured otherwise.
pub struct ReviewComplexity {
    descriptor: MetricRuleDescriptor,
}

impl ReviewComplexity {
    pub fn new(peer_policy: PeerPolicy) -> Self {
        Self {
            descriptor: MetricRuleDescriptor {
                peer_policy,
                ..DESCRIPTOR.clone()
            },
        }
    }
}

impl Default for ReviewComplexity {
    fn default() -> Self {
        Self::new(DESCRIPTOR.peer_policy)
    }
}

#[async_trait]
impl MetricRule for ReviewComplexity {
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
