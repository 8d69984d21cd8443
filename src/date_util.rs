use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Storage format for timestamps. Fixed width and UTC, so string order is time order.
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Format a timestamp for storage and range comparisons in SQL.
pub fn to_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in any of the accepted forms:
/// RFC 3339 (`2025-01-10T12:00:00Z`, `2025-01-10T12:00:00+02:00`),
/// naive `2025-01-10 12:00:00` (taken as UTC), or a bare date (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
}

/// Like [`parse_timestamp`], but a bare date resolves to the last second of that day.
/// Used for inclusive range ends.
pub fn parse_range_end(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return end_of_day(d);
    }
    parse_timestamp(s)
}

/// Last second of `d`. `None` when `d` is the last representable date.
pub fn end_of_day(d: NaiveDate) -> Option<DateTime<Utc>> {
    let next = d.succ_opt()?;
    Some(Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)) - Duration::seconds(1))
}

/// Whether `ts` formats as a plain four-digit year, so storage strings
/// still compare in time order.
pub fn is_storable(ts: DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Monday of the ISO week containing `d`.
pub fn week_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_monday() as i64)
}
