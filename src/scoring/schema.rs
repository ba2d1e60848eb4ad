//! Named, ordered feature slots for model input

use crate::error::{Result, SentinelError};
use crate::features::BasicFeatures;
use crate::types::transaction::numeric_value;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Feature mapping as submitted by clients
pub type FeatureMap = HashMap<String, Value>;

/// Fixed list of named slots. Vector positions come from the schema, never
/// from the order keys arrive in.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    slots: Vec<String>,
}

impl FeatureSchema {
    pub fn new<S: AsRef<str>>(slots: &[S]) -> Result<Self> {
        if slots.is_empty() {
            return Err(SentinelError::Inference("feature schema is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for slot in slots {
            if !seen.insert(slot.as_ref()) {
                return Err(SentinelError::Inference(format!(
                    "duplicate feature slot `{}`",
                    slot.as_ref()
                )));
            }
        }

        Ok(Self {
            slots: slots.iter().map(|s| s.as_ref().to_string()).collect(),
        })
    }

    /// Schema matching the basic transaction extractor
    pub fn basic() -> Self {
        Self {
            slots: BasicFeatures::NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Place every slot's value at its schema position.
    ///
    /// A missing slot or non-numeric value is an inference error; keys not in
    /// the schema are ignored.
    pub fn vectorize(&self, features: &FeatureMap) -> Result<Vec<f64>> {
        let vector = self
            .slots
            .iter()
            .map(|slot| {
                let value = features.get(slot).ok_or_else(|| {
                    SentinelError::Inference(format!("missing feature `{}`", slot))
                })?;
                numeric_value(value, slot).map_err(|e| SentinelError::Inference(e.to_string()))
            })
            .collect::<Result<Vec<f64>>>()?;

        let ignored = features.keys().filter(|k| !self.slots.contains(k)).count();
        if ignored > 0 {
            debug!(ignored = ignored, "Ignoring features outside the schema");
        }

        Ok(vector)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.slots
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::basic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> FeatureMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_positions_follow_schema_not_key_order() {
        let schema = FeatureSchema::new(&["a", "b", "c"]).unwrap();

        let first = schema.vectorize(&map(json!({"c": 3, "a": 1, "b": 2}))).unwrap();
        let second = schema.vectorize(&map(json!({"b": 2, "c": 3, "a": 1}))).unwrap();

        assert_eq!(first, vec![1.0, 2.0, 3.0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_numeric_strings_accepted_extra_keys_ignored() {
        let schema = FeatureSchema::new(&["x"]).unwrap();
        let vector = schema.vectorize(&map(json!({"x": "2.5", "noise": "abc"}))).unwrap();
        assert_eq!(vector, vec![2.5]);
    }

    #[test]
    fn test_missing_or_non_numeric_slot() {
        let schema = FeatureSchema::new(&["x", "y"]).unwrap();

        assert!(matches!(
            schema.vectorize(&map(json!({"x": 1}))),
            Err(SentinelError::Inference(_))
        ));
        assert!(matches!(
            schema.vectorize(&map(json!({"x": 1, "y": "high"}))),
            Err(SentinelError::Inference(_))
        ));
        assert!(schema.vectorize(&map(json!({"x": 1, "y": [1]}))).is_err());
    }

    #[test]
    fn test_invalid_schemas() {
        assert!(FeatureSchema::new::<&str>(&[]).is_err());
        assert!(FeatureSchema::new(&["a", "a"]).is_err());
    }

    #[test]
    fn test_basic_schema() {
        let schema = FeatureSchema::basic();
        assert_eq!(schema.len(), 5);
        assert_eq!(schema.names()[0], "value");
    }
}
