//! Pull-request productivity metrics.
//!
//! A [`MetricsEngine`] runs a registry of metric rules over one request
//! payload and returns, per rule, a snapshot value with a peer baseline and
//! an interval-bucketed series. Numbers come from an [`AggregationBackend`];
//! [`SqliteBackend`] answers them from a local warehouse filled by
//! [`import::import_dataset`].

pub mod backend;
pub mod date_util;
pub mod error;
pub mod import;
pub mod metrics;
pub mod model;
pub mod params;
pub mod storage;

pub use backend::{AggregationBackend, PeerQuery, SqliteBackend, SubjectQuery};
pub use error::{Error, Result};
pub use import::{import_dataset, Dataset, ImportReport};
pub use metrics::{
    EngineConfig, Evaluation, GraphMetric, MetricRule, MetricRuleDescriptor, MetricsEngine,
    MetricsResponse, SnapshotMetric, TimeSeriesEntry,
};
pub use params::{extract_parameters, Interval, ParameterContext};
pub use storage::Database;
