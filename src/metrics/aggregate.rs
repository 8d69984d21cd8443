use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{Operation, PeerAggregation};
use crate::params::Interval;

/// Apply `operation` to a set of per-PR values. An empty set is 0 for every operation.
pub fn aggregate(operation: Operation, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    match operation {
        Operation::Count => values.len() as f64,
        Operation::Sum => values.iter().sum(),
        Operation::Avg => values.iter().sum::<f64>() / values.len() as f64,
        Operation::Median => median(values),
        Operation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Operation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

/// Collapse a peer group's values into one comparison number.
/// `peer_count` is the size of the requested peer set, not the number of
/// accounts that happened to have activity.
pub fn peer_aggregate(aggregation: PeerAggregation, values: &[f64], peer_count: usize) -> f64 {
    match aggregation {
        PeerAggregation::PerAccountAverage => {
            if peer_count == 0 {
                0.0
            } else {
                values.iter().sum::<f64>() / peer_count as f64
            }
        }
        PeerAggregation::Mean => aggregate(Operation::Avg, values),
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Group timestamped values into interval buckets and reduce each bucket.
/// Only buckets with at least one value appear; keys come back in ascending order.
pub fn bucketed(
    rows: &[(DateTime<Utc>, f64)],
    interval: Interval,
    reduce: impl Fn(&[f64]) -> f64,
) -> Vec<(String, f64)> {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (ts, value) in rows {
        buckets
            .entry(interval.bucket_key(*ts))
            .or_default()
            .push(*value);
    }
    buckets
        .into_iter()
        .map(|(key, values)| {
            let reduced = reduce(&values);
            (key, reduced)
        })
        .collect()
}
