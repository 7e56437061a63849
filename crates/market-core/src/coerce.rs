//! Total numeric coercions for upstream values.
//!
//! Providers send numbers as JSON numbers, as strings, or as placeholders
//! such as `"None"` or `"-"`. None of these functions fail: the `parse_*`
//! family returns `None` for anything unusable and the `safe_*` family
//! substitutes the caller's default.

use serde_json::Value;

const PLACEHOLDERS: &[&str] = &["", "-", "--", "none", "null", "n/a", "na", "nan"];

pub fn is_placeholder(raw: &str) -> bool {
    let trimmed = raw.trim();
    PLACEHOLDERS
        .iter()
        .any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// Parses a finite number from text, ignoring thousands separators.
pub fn parse_number_str(raw: &str) -> Option<f64> {
    if is_placeholder(raw) {
        return None;
    }
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

/// Like [`parse_float`], but `"8.5%"` becomes `0.085`. Bare numbers are
/// assumed to already be fractions.
pub fn parse_fraction(value: &Value) -> Option<f64> {
    if let Value::String(s) = value {
        if let Some(pct) = s.trim().strip_suffix('%') {
            return parse_number_str(pct).map(|v| v / 100.0);
        }
    }
    parse_float(value)
}

/// Non-negative whole count; fractional input is truncated.
pub fn parse_count(value: &Value) -> Option<u32> {
    parse_float(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.trunc().min(u32::MAX as f64) as u32)
}

pub fn parse_count_str(raw: &str) -> Option<u32> {
    parse_count(&Value::String(raw.to_string()))
}

pub fn safe_float(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(parse_float).unwrap_or(default)
}

pub fn safe_fraction(value: Option<&Value>, default: f64) -> f64 {
    value.and_then(parse_fraction).unwrap_or(default)
}

pub fn safe_int(value: Option<&Value>, default: u32) -> u32 {
    value.and_then(parse_count).unwrap_or(default)
}
