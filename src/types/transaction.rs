//! On-chain transaction records consumed by the feature extractor

use crate::error::{Result, SentinelError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single observed transfer between two addresses.
///
/// Numeric fields are accepted either as JSON numbers or numeric strings,
/// since RPC nodes and indexers commonly return wei amounts as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Sender address
    pub from: String,

    /// Recipient address
    pub to: String,

    /// Transferred value
    #[serde(deserialize_with = "number_or_string")]
    pub value: f64,

    /// Gas price paid
    #[serde(deserialize_with = "number_or_string")]
    pub gas_price: f64,

    /// Gas consumed
    #[serde(deserialize_with = "number_or_string")]
    pub gas_used: f64,

    /// Unix timestamp in seconds
    #[serde(deserialize_with = "timestamp_or_string")]
    pub timestamp: i64,
}

/// Keys a raw transaction record must carry, in wire naming.
pub const REQUIRED_FIELDS: [&str; 6] = ["from", "to", "value", "gasPrice", "gasUsed", "timestamp"];

impl Transaction {
    pub fn new(from: &str, to: &str, value: f64, gas_price: f64, gas_used: f64, timestamp: i64) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            value,
            gas_price,
            gas_used,
            timestamp,
        }
    }

    /// Build a transaction from an untyped JSON record.
    ///
    /// Fails with `MissingField` naming the first absent key, or
    /// `InvalidField` when a value has the wrong shape.
    pub fn from_record(record: &Value) -> Result<Self> {
        let object = record
            .as_object()
            .ok_or_else(|| SentinelError::invalid_field("transaction", "expected a JSON object"))?;

        for field in REQUIRED_FIELDS {
            if !object.contains_key(field) {
                return Err(SentinelError::MissingField(field.to_string()));
            }
        }

        Ok(Self {
            from: address_field(&object["from"], "from")?,
            to: address_field(&object["to"], "to")?,
            value: numeric_value(&object["value"], "value")?,
            gas_price: numeric_value(&object["gasPrice"], "gasPrice")?,
            gas_used: numeric_value(&object["gasUsed"], "gasUsed")?,
            timestamp: timestamp_value(&object["timestamp"], "timestamp")?,
        })
    }

    /// Convert a batch of raw records, failing on the first malformed one.
    pub fn from_records(records: &[Value]) -> Result<Vec<Self>> {
        records.iter().map(Self::from_record).collect()
    }
}

/// Read a JSON number or numeric string as `f64`.
pub(crate) fn numeric_value(value: &Value, field: &str) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(SentinelError::invalid_field(
            field,
            format!("expected a numeric value, got {}", value),
        )),
    }
}

/// Read a JSON number or numeric string as whole seconds within the `i64` range.
pub(crate) fn timestamp_value(value: &Value, field: &str) -> Result<i64> {
    if let Some(seconds) = value.as_i64() {
        return Ok(seconds);
    }

    let seconds = numeric_value(value, field)?;
    // i64::MAX as f64 rounds up to 2^63, itself out of range
    if seconds.fract() != 0.0 || seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
        return Err(SentinelError::invalid_field(
            field,
            format!("expected whole seconds within the i64 range, got {}", value),
        ));
    }
    Ok(seconds as i64)
}

fn address_field(value: &Value, field: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SentinelError::invalid_field(field, "expected an address string"))
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    numeric_value(&value, "numeric field").map_err(serde::de::Error::custom)
}

fn timestamp_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    timestamp_value(&value, "timestamp").map_err(serde::de::Error::custom)
}
