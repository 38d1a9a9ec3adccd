use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Render a timestamp the way clients expect it: UTC, millisecond precision, `Z` suffix.
pub fn format(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Creation stamp for the in-memory store, pushed `offset_secs` into the future so that
/// records created within the same instant still sort apart.
pub fn offset_by_secs(now: DateTime<Utc>, offset_secs: usize) -> String {
    let offset = i64::try_from(offset_secs).unwrap_or(i64::MAX / 1000);
    format(now + Duration::seconds(offset))
}

/// Stamp for a mutation of a record last stamped at `previous`.
///
/// Creation stamps may lie in the future, so `now` alone would not guarantee the
/// value grows; fall back to one millisecond past the previous stamp.
pub fn next_after(previous: &str, now: DateTime<Utc>) -> String {
    match parse(previous) {
        Some(prev) if prev >= now => format(prev + Duration::milliseconds(1)),
        _ => format(now),
    }
}
