use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::date_util::{is_storable, parse_range_end, parse_timestamp, week_start};
use crate::error::{Error, Result};

const SUBJECT_ACCOUNTS_KEY: &str = "sourceControlAccountIDs";
const PEER_ACCOUNTS_KEY: &str = "peersSourceControlAccountIDs";
const PREFIXES_KEY: &str = "pr_prefixes";
const ORGANIZATION_KEY: &str = "organizationId";

/// Bucket width for graph metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    /// Parse an interval name. Only the exact lowercase names are accepted.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Interval::Daily),
            "weekly" => Ok(Interval::Weekly),
            "monthly" => Ok(Interval::Monthly),
            other => Err(Error::invalid_request(format!(
                "interval must be one of daily, weekly, monthly (got {other:?})"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }

    /// The date key of the bucket containing `ts`.
    ///
    /// - daily: `2025-01-08`
    /// - weekly: the Monday of the ISO week, `2025-01-06`
    /// - monthly: `2025-01`
    pub fn bucket_key(&self, ts: DateTime<Utc>) -> String {
        let d = ts.date_naive();
        match self {
            Interval::Daily => d.format("%Y-%m-%d").to_string(),
            Interval::Weekly => week_start(d).format("%Y-%m-%d").to_string(),
            Interval::Monthly => format!("{}-{:02}", d.year(), d.month()),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed request parameters shared by every metric rule for one engine call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterContext {
    pub organization_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: Interval,
    pub subject_account_ids: BTreeSet<Uuid>,
    pub peer_account_ids: BTreeSet<Uuid>,
    pub title_prefixes: Vec<String>,
}

impl ParameterContext {
    pub fn has_peers(&self) -> bool {
        !self.peer_account_ids.is_empty()
    }
}

/// Parse a raw request payload into a [`ParameterContext`].
///
/// Checks run in a fixed order and the first failure wins: interval,
/// date range, the `metric_params` blob, `organizationId`, the two
/// account-id lists, then `pr_prefixes`.
pub fn extract_parameters(payload: &Value) -> Result<ParameterContext> {
    let interval = match payload.get("interval").and_then(Value::as_str) {
        Some(s) => Interval::parse(s)?,
        None => {
            return Err(Error::invalid_request(
                "interval is required and must be one of daily, weekly, monthly",
            ))
        }
    };

    let (start, end) = extract_date_range(payload)?;

    let params = metric_params(payload)?;

    let organization_id = match params.get(ORGANIZATION_KEY) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(Error::invalid_request("organizationId is required"))
        }
        Some(_) => return Err(Error::invalid_request("organizationId must be a string")),
    };

    let subject_account_ids = account_ids(&params, SUBJECT_ACCOUNTS_KEY)?;
    let peer_account_ids = account_ids(&params, PEER_ACCOUNTS_KEY)?;
    let title_prefixes = prefixes(&params)?;

    Ok(ParameterContext {
        organization_id,
        start,
        end,
        interval,
        subject_account_ids,
        peer_account_ids,
        title_prefixes,
    })
}

fn extract_date_range(payload: &Value) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (raw_start, raw_end) = match (non_null(payload, "start_date"), non_null(payload, "end_date")) {
        (Some(s), Some(e)) => (s, e),
        _ => return Err(Error::invalid_request("start_date and end_date are required")),
    };
    let start = date_value(raw_start, false)
        .ok_or_else(|| Error::invalid_request(format!("invalid start_date: {raw_start}")))?;
    let end = date_value(raw_end, true)
        .ok_or_else(|| Error::invalid_request(format!("invalid end_date: {raw_end}")))?;
    if start > end {
        return Err(Error::invalid_request("start_date must not be after end_date"));
    }
    Ok((start, end))
}

fn non_null<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|v| !v.is_null())
}

/// Dates arrive either as strings or as Unix seconds. Years outside
/// 0..=9999 are refused since their storage form would not sort.
fn date_value(v: &Value, range_end: bool) -> Option<DateTime<Utc>> {
    let ts = match v {
        Value::String(s) if range_end => parse_range_end(s),
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }?;
    is_storable(ts).then_some(ts)
}

/// The parameter blob is either a JSON object or a string holding one.
fn metric_params(payload: &Value) -> Result<Map<String, Value>> {
    let invalid = || Error::invalid_request("invalid metric params format");
    match payload.get("metric_params") {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

fn account_ids(params: &Map<String, Value>, key: &str) -> Result<BTreeSet<Uuid>> {
    let items = match params.get(key) {
        None | Some(Value::Null) => return Ok(BTreeSet::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::invalid_request(format!(
                "invalid source control account id: {key} must be an array, got {other}"
            )))
        }
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| {
                    Error::invalid_request(format!("invalid source control account id: {item}"))
                })
        })
        .collect()
}

fn prefixes(params: &Map<String, Value>) -> Result<Vec<String>> {
    let invalid = || Error::invalid_request("invalid pr_prefixes format");
    match params.get(PREFIXES_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        Some(_) => Err(invalid()),
    }
}
