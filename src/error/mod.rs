// Error types for the genre classifier
//
// This module defines typed error enums for the analysis, inference and
// playback paths. Every error carries a stable numeric code so callers can
// branch on the kind without matching on message text.

mod analysis;
mod inference;
mod playback;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use inference::{log_inference_error, InferenceError, InferenceErrorCodes};
pub use playback::{log_playback_error, PlaybackError, PlaybackErrorCodes};

use std::fmt;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the analysis, inference and playback layers.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Failure of the shared file → genre pipeline
///
/// The presentation layer inspects this instead of catching everything:
/// either the audio could not be turned into a feature vector, or the
/// artifacts could not turn the vector into a label.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifyError {
    Analysis(AnalysisError),
    Inference(InferenceError),
}

impl ErrorCode for ClassifyError {
    fn code(&self) -> i32 {
        match self {
            ClassifyError::Analysis(err) => err.code(),
            ClassifyError::Inference(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ClassifyError::Analysis(err) => err.message(),
            ClassifyError::Inference(err) => err.message(),
        }
    }
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::Analysis(err) => err.fmt(f),
            ClassifyError::Inference(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassifyError::Analysis(err) => Some(err),
            ClassifyError::Inference(err) => Some(err),
        }
    }
}

impl From<AnalysisError> for ClassifyError {
    fn from(err: AnalysisError) -> Self {
        ClassifyError::Analysis(err)
    }
}

impl From<InferenceError> for ClassifyError {
    fn from(err: InferenceError) -> Self {
        ClassifyError::Inference(err)
    }
}
