use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AggregationBackend, PeerQuery, SubjectQuery};
use crate::date_util::{parse_timestamp, to_db_timestamp};
use crate::error::{Error, Result};
use crate::metrics::aggregate::{aggregate, bucketed, peer_aggregate};
use crate::metrics::types::{Dimension, TimeSeriesEntry};
use crate::params::Interval;
use crate::storage::repository::{self, ActivityFilter};
use crate::storage::Database;

/// Aggregation backend over the local SQLite warehouse.
///
/// Per-PR values are loaded with one query and reduced in Rust, so every
/// dimension shares the same aggregation semantics.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Database,
}

impl SqliteBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn load(
        &self,
        dimension: Dimension,
        organization_id: &str,
        account_ids: &BTreeSet<Uuid>,
        prefixes: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        let filter = ActivityFilter {
            dimension,
            organization_id: organization_id.to_string(),
            account_ids: account_ids.iter().map(Uuid::to_string).collect(),
            prefixes: prefixes.to_vec(),
            start: to_db_timestamp(start),
            end: to_db_timestamp(end),
        };
        let rows = self
            .db
            .reader()
            .call(move |conn| repository::activity_values(conn, &filter))
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        log::debug!("loaded {} {dimension} rows for {organization_id}", rows.len());

        rows.into_iter()
            .map(|(ts, value)| {
                parse_timestamp(&ts)
                    .map(|ts| (ts, value))
                    .ok_or_else(|| Error::Database(format!("corrupt timestamp in warehouse: {ts}")))
            })
            .collect()
    }

    async fn load_subject(&self, q: &SubjectQuery<'_>) -> Result<Vec<(DateTime<Utc>, f64)>> {
        self.load(q.dimension, q.organization_id, q.account_ids, q.prefixes, q.start, q.end)
            .await
    }

    async fn load_peers(&self, q: &PeerQuery<'_>) -> Result<Vec<(DateTime<Utc>, f64)>> {
        self.load(q.dimension, q.organization_id, q.account_ids, q.prefixes, q.start, q.end)
            .await
    }
}

fn to_series(buckets: Vec<(String, f64)>, label: &str) -> Vec<TimeSeriesEntry> {
    buckets
        .into_iter()
        .map(|(date, value)| TimeSeriesEntry::single(date, label, value))
        .collect()
}

fn values(rows: &[(DateTime<Utc>, f64)]) -> Vec<f64> {
    rows.iter().map(|(_, v)| *v).collect()
}

#[async_trait]
impl AggregationBackend for SqliteBackend {
    async fn compute_scalar(&self, query: &SubjectQuery<'_>) -> Result<f64> {
        let rows = self.load_subject(query).await?;
        Ok(aggregate(query.operation, &values(&rows)))
    }

    async fn compute_series(
        &self,
        query: &SubjectQuery<'_>,
        label: &str,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesEntry>> {
        let rows = self.load_subject(query).await?;
        let op = query.operation;
        Ok(to_series(bucketed(&rows, interval, |v| aggregate(op, v)), label))
    }

    async fn compute_peer_scalar(&self, query: &PeerQuery<'_>) -> Result<f64> {
        // An empty peer set must not widen to the whole organization.
        if query.account_ids.is_empty() {
            return Ok(0.0);
        }
        let rows = self.load_peers(query).await?;
        Ok(peer_aggregate(
            query.dimension.peer_aggregation(),
            &values(&rows),
            query.account_ids.len(),
        ))
    }

    async fn compute_peer_series(
        &self,
        query: &PeerQuery<'_>,
        label: &str,
        interval: Interval,
    ) -> Result<Vec<TimeSeriesEntry>> {
        if query.account_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.load_peers(query).await?;
        let aggregation = query.dimension.peer_aggregation();
        let peer_count = query.account_ids.len();
        Ok(to_series(
            bucketed(&rows, interval, |v| peer_aggregate(aggregation, v, peer_count)),
            label,
        ))
    }
}
