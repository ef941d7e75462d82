// src/normalize.rs
//! Field-level cleanup for raw article metadata: dates and ticker lists.
//! Both normalizers degrade to a safe default on bad input; they never abort
//! article processing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::warn;

/// Noise prefix some providers prepend to their timestamps.
const DATE_NOISE_PREFIX: &str = "Published ";

/// Explicit formats tried in order before the generic cascade.
const DATE_FORMATS: [&str; 3] = [
    "%m/%d/%Y, %I:%M %p",    // 12/25/2023, 10:30 AM
    "%Y-%m-%d %H:%M:%S",     // 2023-12-25 10:30:00
    "%Y-%m-%dT%H:%M:%S%.fZ", // ISO with optional fractional seconds, UTC marker
];

/// Promotional boilerplate that scrapers occasionally leave in ticker lists.
/// Matched case-insensitively as substrings.
const TICKER_EXCLUSIONS: [&str; 5] = ["ad-free", "premium", "subscribe", "get 100%", "experience"];

/// Normalize a raw date value (string, epoch number, or already null) into a
/// naive timestamp. Unparseable input yields `None`, never an error.
pub fn normalize_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Null => None,
        Value::String(s) => normalize_date_str(s),
        // Already-structured input: unix epoch seconds.
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc()),
        other => {
            warn!(value = %other, "unsupported date value shape");
            None
        }
    }
}

fn normalize_date_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.strip_prefix(DATE_NOISE_PREFIX).unwrap_or(s);

    for fmt in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    match best_effort_parse(s) {
        Some(dt) => Some(dt),
        None => {
            warn!(date = raw, "date did not match any known format");
            None
        }
    }
}

/// Generic last-resort parse: RFC 3339, RFC 2822, then bare dates at
/// midnight.
fn best_effort_parse(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Clean a ticker candidate list into a comma-joined string. Non-string
/// entries, empties, and promotional fragments are dropped; survivors keep
/// their original relative order, without deduplication.
pub fn normalize_tickers(candidates: &[Value]) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for candidate in candidates {
        let Value::String(s) = candidate else {
            continue;
        };
        let t = s.trim();
        if t.is_empty() {
            continue;
        }
        let lower = t.to_lowercase();
        if TICKER_EXCLUSIONS.iter().any(|frag| lower.contains(frag)) {
            continue;
        }
        kept.push(t);
    }
    kept.join(", ")
}
