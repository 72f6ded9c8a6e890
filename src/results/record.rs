//! Record type and value normalization helpers

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One transaction as a field name → JSON value map, in source column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionRecord(Map<String, Value>);

impl TransactionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, keeping its first insertion position
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Value)> for TransactionRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Timestamps render as RFC 3339 in UTC on every backend
pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Naive datetimes from the relational store are taken to be UTC
pub fn naive_timestamp_value(ts: NaiveDateTime) -> Value {
    timestamp_value(ts.and_utc())
}

pub fn date_value(date: NaiveDate) -> Value {
    Value::String(date.format("%Y-%m-%d").to_string())
}

/// NaN and infinities have no JSON form and become null
pub fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Decimal text becomes a number only when the float prints back as the same
/// decimal; anything wider than an `f64` keeps its exact text
pub fn decimal_value(text: &str) -> Value {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && canonical_decimal(&f.to_string()) == canonical_decimal(trimmed) => {
            float_value(f)
        }
        _ => Value::String(text.to_string()),
    }
}

/// Strip a leading `+`, leading integer zeros and trailing fraction zeros
fn canonical_decimal(text: &str) -> String {
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => ("-", &text[1..]),
        Some(b'+') => ("", &text[1..]),
        _ => ("", text),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    }
}

pub fn bytes_value(bytes: &[u8]) -> Value {
    Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
}
