//! Total conversions from raw JSON fields to column types.
//!
//! Every function here accepts whatever the API sent and returns `None` for
//! anything unconvertible: a malformed field degrades to NULL, it never
//! fails the row.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub fn as_text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_string)
}

pub fn as_bool(v: Option<&Value>) -> Option<bool> {
    v.and_then(Value::as_bool)
}

pub fn as_i64(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn as_i32(v: Option<&Value>) -> Option<i32> {
    as_i64(v).and_then(|n| i32::try_from(n).ok())
}

pub fn as_decimal(v: Option<&Value>) -> Option<BigDecimal> {
    match v? {
        // Parse the number's own literal so no float round-trip is involved.
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// ISO 8601 strings (with `Z` or an explicit offset) or epoch seconds.
pub fn as_datetime(v: Option<&Value>) -> Option<DateTime<Utc>> {
    match v? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0)
            } else {
                let f = n.as_f64()?;
                DateTime::from_timestamp(f.trunc() as i64, (f.fract() * 1e9) as u32)
            }
        }
        _ => None,
    }
}

/// JSONB columns must be serialized exactly once. Structurally variable
/// sub-objects sometimes arrive as already-encoded JSON strings; those are
/// parsed back into structure instead of being encoded a second time.
pub fn as_jsonb(v: Option<&Value>) -> Option<Value> {
    match v? {
        Value::Null => None,
        Value::String(s) => {
            serde_json::from_str(s).ok().or_else(|| Some(Value::String(s.clone())))
        }
        other => Some(other.clone()),
    }
}
