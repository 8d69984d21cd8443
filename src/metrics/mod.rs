pub mod aggregate;
pub mod engine;
pub mod merge;
pub mod rules;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineConfig, Evaluation, MetricsEngine};
pub use merge::{merge_time_series, PEERS_KEY};
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;

use crate::backend::{AggregationBackend, PeerQuery, SubjectQuery};
use crate::error::{Error, Result};
use crate::params::{extract_parameters, ParameterContext};

/// One snapshot value and one graph series for a rule.
pub type MetricPair = (SnapshotMetric, GraphMetric);

/// A single metric computation. Implementations are stateless apart from
/// their configuration and can be shared across requests.
#[async_trait]
pub trait MetricRule: Send + Sync {
    fn descriptor(&self) -> &MetricRuleDescriptor;

    fn category(&self) -> ReportingCategory {
        self.descriptor().category.clone()
    }

    fn operation(&self) -> Operation {
        self.descriptor().operation
    }

    fn peer_policy(&self) -> PeerPolicy {
        self.descriptor().peer_policy
    }

    async fn calculate(
        &self,
        backend: &dyn AggregationBackend,
        params: &ParameterContext,
    ) -> Result<MetricPair>;

    /// Validate a raw request payload, then [`calculate`](Self::calculate).
    async fn calculate_payload(
        &self,
        backend: &dyn AggregationBackend,
        payload: &Value,
    ) -> Result<MetricPair> {
        let params = extract_parameters(payload)?;
        self.calculate(backend, &params).await
    }
}

/// The computation every rule shares: subject scalar, subject series, then
/// peer scalar and peer series when the rule's peer policy calls for them.
pub async fn compute_standard<R: MetricRule + ?Sized>(
    rule: &R,
    backend: &dyn AggregationBackend,
    params: &ParameterContext,
) -> Result<MetricPair> {
    let desc = rule.descriptor();
    let subject = SubjectQuery::new(desc.dimension, rule.operation(), params);
    let context = |call: &str| format!("{}: {call}", desc.id);

    log::debug!(
        "computing {} ({} over {} subject accounts)",
        desc.id,
        subject.operation,
        params.subject_account_ids.len()
    );

    let value = backend
        .compute_scalar(&subject)
        .await
        .map_err(|e| Error::backend(context("subject scalar"), e))?;
    let series = backend
        .compute_series(&subject, desc.label, params.interval)
        .await
        .map_err(|e| Error::backend(context("subject series"), e))?;

    let (peers_value, time_series) = if rule.peer_policy().should_query(params.has_peers()) {
        let peers = PeerQuery::new(desc.dimension, params);
        let peers_value = backend
            .compute_peer_scalar(&peers)
            .await
            .map_err(|e| Error::backend(context("peer scalar"), e))?;
        let peer_series = backend
            .compute_peer_series(&peers, desc.label, params.interval)
            .await
            .map_err(|e| Error::backend(context("peer series"), e))?;
        (peers_value, merge_time_series(series, &peer_series))
    } else {
        (0.0, series)
    };

    Ok((
        SnapshotMetric {
            label: desc.label.to_string(),
            description: desc.description.to_string(),
            value,
            peers_value,
            unit: desc.unit,
            icon_identifier: desc.icon.map(|i| i.identifier.to_string()),
            icon_color: desc.icon.map(|i| i.color.to_string()),
        },
        GraphMetric {
            label: desc.label.to_string(),
            graph_type: desc.graph_type,
            unit: desc.unit,
            time_series,
        },
    ))
}
