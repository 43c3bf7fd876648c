use crate::domain::Value;
use crate::ports::{EtlError, Result};

/// Extracts the label name from a packed `name-value` token
/// e.g. "aid_related-1" -> "aid_related". A token without '-' is its own name.
pub fn label_name(token: &str) -> &str {
    match token.rsplit_once('-') {
        Some((name, _)) => name,
        None => token,
    }
}

/// Decodes a label value from the final character of a packed token.
/// Only the last character counts, so "water-12" decodes as 2.
pub fn label_value(token: &str, row: usize) -> Result<i64> {
    token
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .map(i64::from)
        .ok_or_else(|| EtlError::NumericCoercion {
            row,
            token: token.to_string(),
        })
}

/// Converts the raw text cells of one column into typed values.
/// Empty cells become Null; the column is Integer if every other cell parses
/// as i64, Real if every other cell parses as f64, Text otherwise.
pub fn infer_column(raw: &[&str]) -> Vec<Value> {
    let present = || raw.iter().filter(|s| !s.is_empty());

    if present().all(|s| s.parse::<i64>().is_ok()) {
        return raw
            .iter()
            .map(|s| s.parse::<i64>().map(Value::Integer).unwrap_or(Value::Null))
            .collect();
    }

    if present().all(|s| s.parse::<f64>().is_ok()) {
        return raw
            .iter()
            .map(|s| s.parse::<f64>().map(Value::Real).unwrap_or(Value::Null))
            .collect();
    }

    raw.iter()
        .map(|s| {
            if s.is_empty() {
                Value::Null
            } else {
                Value::Text(s.to_string())
            }
        })
        .collect()
}
