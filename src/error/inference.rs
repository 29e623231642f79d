// Inference error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Inference error code constants
///
/// Error code range: 4001-4003
pub struct InferenceErrorCodes {}

impl InferenceErrorCodes {
    /// An artifact file could not be read or parsed
    pub const ARTIFACT_LOAD: i32 = 4001;

    /// Artifact or input dimensions disagree
    pub const SHAPE_MISMATCH: i32 = 4002;

    /// Classifier produced an index the label encoder does not know
    pub const UNKNOWN_CLASS: i32 = 4003;
}

/// Log an inference error with structured context
pub fn log_inference_error(err: &InferenceError, context: &str) {
    error!(
        "Inference error in {}: code={}, component=InferenceContext, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading artifacts or running the classifier
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Scaler, label encoder or model file unreadable/unparseable
    ArtifactLoad { artifact: String, reason: String },

    /// Widths of scaler, network and label set are inconsistent
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Argmax index outside of the label encoder's classes
    UnknownClass { index: usize },
}

impl ErrorCode for InferenceError {
    fn code(&self) -> i32 {
        match self {
            InferenceError::ArtifactLoad { .. } => InferenceErrorCodes::ARTIFACT_LOAD,
            InferenceError::ShapeMismatch { .. } => InferenceErrorCodes::SHAPE_MISMATCH,
            InferenceError::UnknownClass { .. } => InferenceErrorCodes::UNKNOWN_CLASS,
        }
    }

    fn message(&self) -> String {
        match self {
            InferenceError::ArtifactLoad { artifact, reason } => {
                format!("Failed to load {}: {}", artifact, reason)
            }
            InferenceError::ShapeMismatch {
                context,
                expected,
                actual,
            } => format!(
                "Shape mismatch in {}: expected {}, got {}",
                context, expected, actual
            ),
            InferenceError::UnknownClass { index } => {
                format!("Class index {} has no label", index)
            }
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InferenceError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for InferenceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_error_codes() {
        let load = InferenceError::ArtifactLoad {
            artifact: "scaler".to_string(),
            reason: "missing".to_string(),
        };
        assert_eq!(load.code(), 4001);

        let shape = InferenceError::ShapeMismatch {
            context: "scaler".to_string(),
            expected: 57,
            actual: 56,
        };
        assert_eq!(shape.code(), 4002);
        assert_eq!(InferenceError::UnknownClass { index: 3 }.code(), 4003);
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = InferenceError::ShapeMismatch {
            context: "network input".to_string(),
            expected: 57,
            actual: 40,
        };
        assert_eq!(
            err.message(),
            "Shape mismatch in network input: expected 57, got 40"
        );
    }
}
