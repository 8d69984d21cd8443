//! Recording backend stub shared by rule and engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::types::{Dimension, Operation, TimeSeriesEntry};
use crate::backend::{AggregationBackend, PeerQuery, SubjectQuery};
use crate::error::{Error, Result};
use crate::params::{Interval, ParameterContext};

pub const SUBJECT: &str = "11111111-1111-4111-8111-111111111111";
pub const PEERS: [&str; 3] = [
    "22222222-2222-4222-8222-222222222221",
    "22222222-2222-4222-8222-222222222222",
    "22222222-2222-4222-8222-222222222223",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Scalar,
    Series,
    PeerScalar,
    PeerSeries,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub kind: CallKind,
    pub dimension: Dimension,
    pub operation: Option<Operation>,
    pub account_count: usize,
}

#[derive(Default)]
pub struct StubBackend {
    scalars: HashMap<(Dimension, bool), f64>,
    series: HashMap<(Dimension, bool), Vec<(String, f64)>>,
    failures: Vec<(Dimension, CallKind)>,
    calls: Mutex<Vec<Call>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, dimension: Dimension, value: f64) -> Self {
        self.scalars.insert((dimension, false), value);
        self
    }

    pub fn with_peer_scalar(mut self, dimension: Dimension, value: f64) -> Self {
        self.scalars.insert((dimension, true), value);
        self
    }

    pub fn with_series(mut self, dimension: Dimension, points: &[(&str, f64)]) -> Self {
        self.series.insert((dimension, false), owned(points));
        self
    }

    pub fn with_peer_series(mut self, dimension: Dimension, points: &[(&str, f64)]) -> Self {
        self.series.insert((dimension, true), owned(points));
        self
    }

    pub fn failing(mut self, dimension: Dimension, kind: CallKind) -> Self {
        self.failures.push((dimension, kind));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peer_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c.kind, CallKind::PeerScalar | CallKind::PeerSeries))
            .count()
    }

    fn record(
        &self,
        kind: CallKind,
        dimension: Dimension,
        operation: Option<Operation>,
        account_count: usize,
    ) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            kind,
            dimension,
            operation,
            account_count,
        });
        if self.failures.contains(&(dimension, kind)) {
            return Err(Error::Database(format!("stub failure: {dimension} {kind:?}")));
        }
        Ok(())
    }

    fn series_for(&self, dimension: Dimension, peers: bool, label: &str) -> Vec<TimeSeriesEntry> {
        self.series
            .get(&(dimension, peers))
            .map(|points| {
                points
                    .iter()
                    .map(|(date, value)| TimeSeriesEntry::single(date.clone(), label, *value))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn owned(points: &[(&str, f64)]) -> Vec<(String, f64)> {
    points.iter().map(|(d, v)| (d.to_string(), *v)).collect()
}

#[async_trait]
impl AggregationBackend for StubBackend {
    async fn compute_scalar(&self, query: &SubjectQuery<'_>) -> Result<f64> {
        self.record(
            CallKind::Scalar,
            query.dimension,
            Some(query.operation),
            query.account_ids.len(),
        )?;
        Ok(self.scalars.get(&(query.dimension, false)).copied().unwrap_or(0.0))
    }

    async fn compute_series(
        &self,
        query: &SubjectQuery<'_>,
        label: &str,
        _interval: Interval,
    ) -> Result<Vec<TimeSeriesEntry>> {
        self.record(
            CallKind::Series,
            query.dimension,
            Some(query.operation),
            query.account_ids.len(),
        )?;
        Ok(self.series_for(query.dimension, false, label))
    }

    async fn compute_peer_scalar(&self, query: &PeerQuery<'_>) -> Result<f64> {
        self.record(CallKind::PeerScalar, query.dimension, None, query.account_ids.len())?;
        Ok(self.scalars.get(&(query.dimension, true)).copied().unwrap_or(0.0))
    }

    async fn compute_peer_series(
        &self,
        query: &PeerQuery<'_>,
        label: &str,
        _interval: Interval,
    ) -> Result<Vec<TimeSeriesEntry>> {
        self.record(CallKind::PeerSeries, query.dimension, None, query.account_ids.len())?;
        Ok(self.series_for(query.dimension, true, label))
    }
}

pub fn sample_params(with_peers: bool) -> ParameterContext {
    ParameterContext {
        organization_id: "org-1".into(),
        start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap(),
        interval: Interval::Weekly,
        subject_account_ids: [Uuid::parse_str(SUBJECT).unwrap()].into_iter().collect(),
        peer_account_ids: if with_peers {
            PEERS.iter().map(|p| Uuid::parse_str(p).unwrap()).collect()
        } else {
            Default::default()
        },
        title_prefixes: Vec::new(),
    }
}

pub fn sample_payload(with_peers: bool) -> Value {
    let mut params = json!({
        "organizationId": "org-1",
        "sourceControlAccountIDs": [SUBJECT],
    });
    if with_peers {
        params["peersSourceControlAccountIDs"] = json!(PEERS);
    }
    json!({
        "start_date": "2025-01-01",
        "end_date": "2025-01-31",
        "interval": "weekly",
        "metric_params": params,
    })
}
