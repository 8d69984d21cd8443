use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The underlying pull-request activity a metric measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    TimeToMerge,
    PrsMerged,
    PrsReviewed,
    LocAdded,
    LocRemoved,
    ReviewComplexity,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::TimeToMerge => "time_to_merge",
            Dimension::PrsMerged => "prs_merged",
            Dimension::PrsReviewed => "prs_reviewed",
            Dimension::LocAdded => "loc_added",
            Dimension::LocRemoved => "loc_removed",
            Dimension::ReviewComplexity => "review_complexity",
        }
    }

    /// How a peer group's values collapse into one comparison number.
    pub fn peer_aggregation(&self) -> PeerAggregation {
        match self {
            Dimension::PrsMerged
            | Dimension::PrsReviewed
            | Dimension::LocAdded
            | Dimension::LocRemoved => PeerAggregation::PerAccountAverage,
            Dimension::TimeToMerge | Dimension::ReviewComplexity => PeerAggregation::Mean,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregation applied across qualifying pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Avg,
    Count,
    Sum,
    Median,
    Max,
    Min,
}

impl Operation {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "avg" | "average" | "mean" => Ok(Operation::Avg),
            "count" => Ok(Operation::Count),
            "sum" => Ok(Operation::Sum),
            "median" => Ok(Operation::Median),
            "max" => Ok(Operation::Max),
            "min" => Ok(Operation::Min),
            other => Err(Error::Config(format!("unknown aggregation operation: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Avg => "avg",
            Operation::Count => "count",
            Operation::Sum => "sum",
            Operation::Median => "median",
            Operation::Max => "max",
            Operation::Min => "min",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Peer values are never computed with the subject's operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAggregation {
    /// Total across the peer group divided by the number of peer accounts.
    PerAccountAverage,
    /// Arithmetic mean of every peer value.
    Mean,
}

/// When a rule queries the backend for peer-group data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerPolicy {
    /// Only when the request names at least one peer account.
    WhenSupplied,
    /// On every request, even with an empty peer set.
    Always,
}

impl PeerPolicy {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "when_supplied" => Ok(PeerPolicy::WhenSupplied),
            "always" => Ok(PeerPolicy::Always),
            other => Err(Error::Config(format!("unknown peer policy: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeerPolicy::WhenSupplied => "when_supplied",
            PeerPolicy::Always => "always",
        }
    }

    pub fn should_query(&self, has_peers: bool) -> bool {
        match self {
            PeerPolicy::WhenSupplied => has_peers,
            PeerPolicy::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Count,
    Seconds,
    Lines,
    Score,
    Percentage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Line,
    Bar,
}

/// Named, priority-ordered grouping used to organize metrics for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportingCategory {
    pub name: &'static str,
    pub priority: u32,
}

pub const CATEGORY_DELIVERY: ReportingCategory = ReportingCategory {
    name: "Delivery",
    priority: 1,
};
pub const CATEGORY_COLLABORATION: ReportingCategory = ReportingCategory {
    name: "Collaboration",
    priority: 2,
};
pub const CATEGORY_CODE_VOLUME: ReportingCategory = ReportingCategory {
    name: "Code Volume",
    priority: 3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Icon {
    pub identifier: &'static str,
    pub color: &'static str,
}

/// Static identity of a metric rule.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRuleDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub category: ReportingCategory,
    pub unit: Unit,
    pub graph_type: GraphType,
    pub dimension: Dimension,
    pub operation: Operation,
    pub peer_policy: PeerPolicy,
    pub icon: Option<Icon>,
}

/// One point-in-time result with its peer-group baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotMetric {
    pub label: String,
    pub description: String,
    pub value: f64,
    pub peers_value: f64,
    pub unit: Unit,
    pub icon_identifier: Option<String>,
    pub icon_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub key: String,
    pub value: f64,
}

/// One time bucket. `data` holds the subject point and, when merged, a peer point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    pub date: String,
    pub data: Vec<DataPoint>,
}

impl TimeSeriesEntry {
    pub fn single(date: impl Into<String>, key: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            data: vec![DataPoint {
                key: key.into(),
                value,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphMetric {
    pub label: String,
    #[serde(rename = "type")]
    pub graph_type: GraphType,
    pub unit: Unit,
    pub time_series: Vec<TimeSeriesEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySnapshots {
    pub category: ReportingCategory,
    pub metrics: Vec<SnapshotMetric>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGraphs {
    pub category: ReportingCategory,
    pub metrics: Vec<GraphMetric>,
}

/// Engine output: one snapshot group and one graph group per registered rule,
/// in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsResponse {
    pub snapshot_metrics: Vec<CategorySnapshots>,
    pub graph_metrics: Vec<CategoryGraphs>,
}
