//! Timestamp encoding shared by the SQLite-backed stores.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Formats a timestamp as fixed-width RFC 3339 (microseconds, `Z` suffix).
///
/// The fixed width keeps lexical order equal to chronological order, which
/// the stores rely on for `ORDER BY` and `>=` comparisons on text columns.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time truncated to the precision [`format_timestamp`] stores, so
/// values survive a round trip through the database unchanged.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Parses a timestamp written by [`format_timestamp`] (or any RFC 3339 value).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}
