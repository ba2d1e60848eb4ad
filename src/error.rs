//! Error types shared by the feature, model and scoring layers

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentinelError>;

#[derive(Debug, Error)]
pub enum SentinelError {
    /// A required transaction key is absent
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// A field is present but cannot be read as a number/address
    #[error("invalid value for field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    /// Division over an empty or zero-width group; resolved to 0.0 by the extractor
    #[error("degenerate group: {0}")]
    DegenerateGroup(String),

    #[error("failed to load model from {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("failed to save model to {path}: {reason}")]
    ModelSave { path: PathBuf, reason: String },

    #[error("model not fitted")]
    NotFitted,

    #[error("insufficient data: need {needed} samples, have {actual}")]
    InsufficientData { needed: usize, actual: usize },

    /// Malformed feature vector at inference time
    #[error("inference error: {0}")]
    Inference(String),
}

impl SentinelError {
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by caller input rather than service state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::InvalidField { .. }
                | Self::Inference(_)
                | Self::InsufficientData { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SentinelError::MissingField("gasPrice".to_string());
        assert_eq!(err.to_string(), "missing required field `gasPrice`");

        let err = SentinelError::invalid_field("value", "not a number");
        assert_eq!(err.to_string(), "invalid value for field `value`: not a number");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(SentinelError::MissingField("to".into()).is_client_error());
        assert!(SentinelError::Inference("bad".into()).is_client_error());
        assert!(!SentinelError::NotFitted.is_client_error());
        assert!(!SentinelError::ModelLoad {
            path: PathBuf::from("m.json"),
            reason: "corrupt".into()
        }
        .is_client_error());
    }
}
