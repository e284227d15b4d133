//! Type-aware value canonicalization.
//!
//! One total function per special column kind, producing the canonical
//! comparison form of a value. Anything a function does not recognize
//! passes through untouched, so normalization never fails; `Null`
//! always passes through.

use chrono::Local;

use crate::metadata::TimezonePolicy;
use crate::value::Value;

/// Normalize to a calendar-date string, `YYYY-MM-DD`.
///
/// A `Timestamp` discards its time-of-day; extraction uses the UTC
/// representation so the result does not depend on the host timezone.
pub fn date_string(value: &Value) -> Value {
    match value {
        Value::Date(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(ts) => Value::Text(ts.date_naive().format("%Y-%m-%d").to_string()),
        other => other.clone(),
    }
}

/// Normalize to a time-of-day string, `HH:MM:SS`.
pub fn time_string(value: &Value) -> Value {
    match value {
        Value::Time(t) => Value::Text(t.format("%H:%M:%S").to_string()),
        Value::Timestamp(ts) => Value::Text(ts.time().format("%H:%M:%S").to_string()),
        other => other.clone(),
    }
}

/// Normalize to a datetime string, `YYYY-MM-DD HH:MM:SS`, rendered in
/// UTC or in the process-local timezone per the column's policy.
pub fn datetime_string(value: &Value, policy: TimezonePolicy) -> Value {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    match value {
        Value::Timestamp(ts) => match policy {
            TimezonePolicy::Utc => Value::Text(ts.format(FORMAT).to_string()),
            TimezonePolicy::Local => {
                Value::Text(ts.with_timezone(&Local).format(FORMAT).to_string())
            }
        },
        Value::Date(d) => Value::Text(format!("{} 00:00:00", d.format("%Y-%m-%d"))),
        other => other.clone(),
    }
}

/// Normalize to the canonical serialized JSON form.
///
/// `Json` serializes directly; `Text` that parses as JSON re-serializes
/// canonically (object keys sorted); any other value goes through
/// [`Value::to_json`] first.
pub fn json_string(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Json(j) => Value::Text(j.to_string()),
        Value::Text(s) => match serde_json::from_str::<serde_json::Value>(s) {
            Ok(parsed) => Value::Text(parsed.to_string()),
            Err(_) => value.clone(),
        },
        other => Value::Text(other.to_json().to_string()),
    }
}

/// Normalize to the ordered string-sequence form of a simple array.
///
/// A delimited `Text` splits on `,`; an existing `Array` has each
/// element rendered to its item string. Comparison of the result is
/// ordered sequence equality.
pub fn simple_array(value: &Value) -> Value {
    match value {
        Value::Text(s) => Value::Array(
            s.split(',')
                .map(|item| Value::Text(item.to_string()))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| Value::Text(item.item_string()))
                .collect(),
        ),
        other => other.clone(),
    }
}
