use std::collections::HashMap;

use super::types::{DataPoint, TimeSeriesEntry};

/// Key of the peer-baseline point appended to a merged bucket.
pub const PEERS_KEY: &str = "peers";

/// Overlay a peer series onto a subject series.
///
/// The result has exactly the subject's buckets, in the subject's order.
/// A subject bucket whose date also appears in the peer series gains one
/// extra point keyed [`PEERS_KEY`] carrying the peer bucket's value.
/// Peer-only dates are dropped.
pub fn merge_time_series(
    subject: Vec<TimeSeriesEntry>,
    peers: &[TimeSeriesEntry],
) -> Vec<TimeSeriesEntry> {
    let peer_values: HashMap<&str, f64> = peers
        .iter()
        .filter_map(|entry| entry.data.first().map(|p| (entry.date.as_str(), p.value)))
        .collect();

    subject
        .into_iter()
        .map(|mut entry| {
            if let Some(&value) = peer_values.get(entry.date.as_str()) {
                entry.data.push(DataPoint {
                    key: PEERS_KEY.to_string(),
                    value,
                });
            }
            entry
        })
        .collect()
}
