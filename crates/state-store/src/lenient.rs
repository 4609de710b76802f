// In crates/state-store/src/lenient.rs

//! Forgiving field deserializers for persisted state.
//!
//! Older state files wrote plain JSON floats, newer ones write decimal strings,
//! and hand edits happen. A bad field falls back to its zero value instead of
//! failing the whole load.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

pub fn decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(decimal_from_value(&value))
}

pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(count.unwrap_or_else(|| {
        if !value.is_null() {
            tracing::warn!(%value, "Unreadable count in state file, using 0.");
        }
        0
    }))
}

/// An optional string. Empty strings and non-strings read as `None`.
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

/// A list whose unreadable entries are dropped with a warning.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unreadable history entry from state file.");
                None
            }
        })
        .collect())
}

/// A string-keyed map whose unreadable values are dropped with a warning.
pub fn map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(entries) = value else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, item)| match serde_json::from_value(item) {
            Ok(entry) => Some((key, entry)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Dropping unreadable symbol state from state file.");
                None
            }
        })
        .collect())
}

fn decimal_from_value(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        Value::Null => Decimal::ZERO,
        other => {
            tracing::warn!(value = %other, "Unreadable number in state file, using 0.");
            Decimal::ZERO
        }
    }
}

fn parse_decimal(raw: &str) -> Decimal {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .unwrap_or_else(|_| {
            tracing::warn!(value = raw, "Unreadable number in state file, using 0.");
            Decimal::ZERO
        })
}
