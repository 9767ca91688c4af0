//! Cell coercion: odds, team names and kickoff times.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Naive layouts tried in order after the offset-bearing ones
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y. %H:%M",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d.%m.%Y.", "%d/%m/%Y"];

/// Above this an integer timestamp is read as milliseconds
const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

/// Decimal odds from a number or a string that may use a comma separator
pub fn parse_odds(value: &Value) -> Option<f64> {
    let odds = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    odds.is_finite().then_some(odds)
}

/// Trimmed, non-empty text. Numbers are accepted (some feeds emit numeric team ids).
pub fn parse_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Kickoff as naive wall-clock time; any timezone offset is dropped, not applied
pub fn parse_kickoff(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_kickoff_str(s),
        Value::Number(n) => {
            let raw = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            let dt = if raw.abs() > EPOCH_MILLIS_CUTOFF {
                DateTime::from_timestamp_millis(raw)?
            } else {
                DateTime::from_timestamp(raw, 0)?
            };
            Some(dt.naive_utc())
        }
        _ => None,
    }
}

fn parse_kickoff_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
