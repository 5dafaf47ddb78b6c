//! Lenient numeric parsing.
//!
//! Models frequently emit numbers as strings (`"12"`, `"1,250.5"`). These
//! helpers accept both shapes and never fail: unparseable input is either
//! passed through unchanged or mapped to `None`.

use serde_json::{Number, Value};

/// Largest integer that survives a round trip through an `f64`.
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Parses a string-like numeric value. Strings are trimmed and thousands
/// separators removed; a finite result replaces the input, anything else
/// returns the input unchanged. Non-string values pass through.
pub fn parse_numeric_like(value: &Value) -> Value {
    match value {
        Value::String(raw) => match parse_numeric_str(raw) {
            Some(parsed) => number_value(parsed),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Returns the value as a finite `f64` when it is a number or a numeric
/// string, `None` otherwise.
pub fn to_finite_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(raw) => parse_numeric_str(raw),
        _ => None,
    }
}

/// Interprets the value as a non-negative integer identifier (floored).
pub fn to_index(value: &Value) -> Option<u64> {
    let floored = to_finite_number(value)?.floor();
    if (0.0..=MAX_SAFE_INTEGER).contains(&floored) {
        Some(floored as u64)
    } else {
        None
    }
}

/// Builds a JSON number, preferring the integer representation when the
/// value is integral.
pub fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn parse_numeric_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    // `f64::from_str` accepts "inf" and "nan" spellings; those are not numbers here.
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
