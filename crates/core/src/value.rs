//! Value helpers for SiftQL.
//!
//! Rows, variable values and results are JSON values. This module holds the
//! coercion rules shared by the predicate compiler, the pushdown translator,
//! the in-memory row source and the pipeline functions, so that all of them
//! agree on what "equal", "empty" and "a date" mean.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use core::cmp::Ordering;
use hashbrown::HashSet;

pub use serde_json::{Map, Value};

/// A fetched row: column name to cell value.
pub type Row = Map<String, Value>;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Returns whether a cell counts as empty: null, missing, `""`, `[]` or `{}`.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Canonical string form used for loose equality and set membership.
///
/// Integral numbers drop their fraction so `1`, `1.0` and `"1"` coincide.
pub fn canonical_key(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
                    (f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
        Value::String(s) => s.clone(),
        other => serialize(other),
    }
}

/// Loose equality: values are equal when their canonical keys are.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    canonical_key(a) == canonical_key(b)
}

/// Deterministic serialization (object keys are ordered).
pub fn serialize(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Text used for string matching: strings verbatim, scalars via `Display`,
/// documents serialized.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) => canonical_key(value),
        other => serialize(other),
    }
}

/// Elements to test against a condition: array items, or the value itself.
pub fn candidates(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Coerces a number or numeric string.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Parses a literal as a number.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Parses a literal as a big integer.
pub fn parse_big_int(text: &str) -> Option<i128> {
    text.trim().parse::<i128>().ok()
}

/// Coerces a number or integer string to a big integer.
pub fn coerce_big_int(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        Value::String(s) => parse_big_int(s),
        _ => None,
    }
}

/// Parses `true`/`false` (case-insensitive) and `1`/`0`.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Coerces a boolean or boolean-like string.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        Value::Number(n) => n.as_i64().and_then(|i| match i {
            1 => Some(true),
            0 => Some(false),
            _ => None,
        }),
        _ => None,
    }
}

/// Best-effort date parsing to Unix milliseconds.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM[:SS[.fff]]` (UTC) and `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis())
}

/// Parses an inclusive upper date bound. A bare date covers the whole day.
pub fn parse_date_upper(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_milli_opt(23, 59, 59, 999)
            .map(|naive| Utc.from_utc_datetime(&naive).timestamp_millis());
    }
    parse_date(trimmed)
}

/// Coerces a date string or epoch-milliseconds number.
pub fn coerce_date(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Total ordering used for sorting results: null first, then numbers,
/// then text, falling back to serialized form for mixed kinds.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(_), Value::Number(_)) => {
            let x = coerce_number(a).unwrap_or(f64::NAN);
            let y = coerce_number(b).unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => serialize(a).cmp(&serialize(b)),
    }
}

/// Removes duplicates by deep equality of the serialized form, keeping the
/// first occurrence.
pub fn dedup_by_serialization(values: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(serialize(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_values() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&Value::Null)));
        assert!(is_empty_value(Some(&json!(""))));
        assert!(is_empty_value(Some(&json!([]))));
        assert!(is_empty_value(Some(&json!({}))));
        assert!(!is_empty_value(Some(&json!(0))));
        assert!(!is_empty_value(Some(&json!(false))));
        assert!(!is_empty_value(Some(&json!(" "))));
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(1.0), &json!(1)));
        assert!(loose_eq(&json!(true), &json!("true")));
        assert!(!loose_eq(&json!(1), &json!(2)));
        assert!(loose_eq(&json!({"b": 1, "a": 2}), &json!({"a": 2, "b": 1})));
    }

    #[test]
    fn test_dates() {
        let day = parse_date("2024-03-01").unwrap();
        assert_eq!(parse_date("2024-03-01T00:00:00Z"), Some(day));
        assert_eq!(parse_date("2024-03-01 00:00:00"), Some(day));
        assert_eq!(parse_date_upper("2024-03-01"), Some(day + 86_399_999));
        assert!(parse_date("yesterday").is_none());
        assert_eq!(coerce_date(&json!(day)), Some(day));
    }

    #[test]
    fn test_coercions() {
        assert_eq!(coerce_number(&json!("3.5")), Some(3.5));
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_bool(&json!("TRUE")), Some(true));
        assert_eq!(coerce_bool(&json!(0)), Some(false));
        assert_eq!(
            coerce_big_int(&json!("9007199254740993")),
            Some(9_007_199_254_740_993)
        );
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_dedup() {
        let values = vec![json!({"a": 1}), json!(1), json!({"a": 1}), json!("1")];
        let unique = dedup_by_serialization(values);
        assert_eq!(unique, vec![json!({"a": 1}), json!(1), json!("1")]);
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&Value::Null, &json!(0)), Ordering::Less);
    }
}
