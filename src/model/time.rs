//! Timestamp normalization for backend documents.
//!
//! Backend records arrive with several timestamp spellings: RFC 3339 strings,
//! bare calendar dates, epoch milliseconds, epoch seconds, and the wrapped
//! `{seconds, nanoseconds}` object shape some client SDKs emit. Everything
//! normalizes to `DateTime<Utc>` at the decode boundary so ordering and
//! comparison logic downstream never probes value shapes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch numbers at or above this magnitude are read as milliseconds.
///
/// 100_000_000_000 seconds lands in the year 5138 while the same number of
/// milliseconds is March 1973, so real data on either side of the line is
/// unambiguous.
pub const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Parse a loosely-typed timestamp value into a UTC instant.
///
/// Accepted shapes, tried in order:
/// - RFC 3339 / ISO-8601 string (an offset-free datetime is read as UTC, a
///   bare `YYYY-MM-DD` date as midnight UTC)
/// - integer epoch (milliseconds at or above [`EPOCH_MILLIS_CUTOFF`], else
///   seconds)
/// - float epoch seconds
/// - object carrying `seconds` (or `_seconds`) plus optional nanoseconds
///
/// Returns `None` for every other shape; callers sort missing instants as the
/// epoch via [`sort_key`].
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_instant_str(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                epoch_to_instant(i)
            } else {
                let f = n.as_f64()?;
                if !f.is_finite() {
                    return None;
                }
                Utc.timestamp_millis_opt((f * 1000.0) as i64).single()
            }
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))?
                .as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos.min(999_999_999) as u32).single()
        }
        _ => None,
    }
}

/// Parse a loosely-typed value into a calendar day.
///
/// Check-in dates are stored as `YYYY-MM-DD` strings; any of the instant
/// shapes accepted by [`parse_instant`] also resolves to its UTC calendar
/// day. Malformed values yield `None` and the record contributes nothing to
/// day-based calculations.
pub fn parse_day(value: &Value) -> Option<NaiveDate> {
    if let Value::String(s) = value {
        if let Ok(day) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            return Some(day);
        }
    }
    parse_instant(value).map(|dt| dt.date_naive())
}

/// Ordering key for an optional instant: missing sorts as the epoch.
pub fn sort_key(ts: Option<DateTime<Utc>>) -> DateTime<Utc> {
    ts.unwrap_or(DateTime::UNIX_EPOCH)
}

fn parse_instant_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?));
    }
    None
}

fn epoch_to_instant(i: i64) -> Option<DateTime<Utc>> {
    if i.abs() >= EPOCH_MILLIS_CUTOFF {
        Utc.timestamp_millis_opt(i).single()
    } else {
        Utc.timestamp_opt(i, 0).single()
    }
}
