pub mod sqlite;

pub use sqlite::SqliteBackend;

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::types::{Dimension, Operation, TimeSeriesEntry};
use crate::params::{Interval, ParameterContext};

/// A subject-side aggregation over one dimension.
#[derive(Debug, Clone, Copy)]
pub struct SubjectQuery<'a> {
    pub dimension: Dimension,
    pub organization_id: &'a str,
    pub account_ids: &'a BTreeSet<Uuid>,
    pub prefixes: &'a [String],
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub operation: Operation,
}

impl<'a> SubjectQuery<'a> {
    pub fn new(dimension: Dimension, operation: Operation, ctx: &'a ParameterContext) -> Self {
        Self {
            dimension,
            organization_id: &ctx.organization_id,
            account_ids: &ctx.subject_account_ids,
            prefixes: &ctx.title_prefixes,
            start: ctx.start,
            end: ctx.end,
            operation,
        }
    }
}

/// A peer-group aggregation. There is no operation: the backend reduces peer
/// values with [`Dimension::peer_aggregation`].
#[derive(Debug, Clone, Copy)]
pub struct PeerQuery<'a> {
    pub dimension: Dimension,
    pub organization_id: &'a str,
    pub account_ids: &'a BTreeSet<Uuid>,
    pub prefixes: &'a [String],
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl<'a> PeerQuery<'a> {
    pub fn new(dimension: Dimension, ctx: &'a ParameterContext) -> Self {
        Self {
            dimension,
            organization_id: &ctx.organization_id,
            account_ids: &ctx.peer_account_ids,
            prefixes: &ctx.title_prefixes,
            start: ctx.start,
            end: ctx.end,
        }
    }
}

/// Answers scalar and time-series aggregation queries over pull-request history.
///
/// Series entries carry a single data point keyed by `label`, one entry per
/// bucket with activity, in ascending date order.
#[async_trait]
pub trait AggregationBackend: Send + Sync {
    async fn compute_scalar(&self, query: &SubjectQuery<'_>) -> Result<f64>;

    async fn compute_series(
        &self,
        query: &SubjectQuery<'_>,
        label: &str,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesEntry>>;

    async fn compute_peer_scalar(&self, query: &PeerQuery<'_>) -> Result<f64>;

    async fn compute_peer_series(
        &self,
        query: &PeerQuery<'_>,
        label: &str,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesEntry>>;
}
