// Analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Error code range: 3001-3003
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Input could not be read or decoded as audio
    pub const DECODE: i32 = 3001;

    /// Decoded waveform has zero samples
    pub const EMPTY_SIGNAL: i32 = 3002;

    /// A feature computation produced a degenerate result
    pub const EXTRACTION: i32 = 3003;
}

/// Log an analysis error with structured context
///
/// This function logs analysis errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=FeatureExtractor, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while turning an audio file into a feature vector
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// File unreadable, unsupported container/codec, or corrupt stream
    Decode { reason: String },

    /// Waveform has zero length, so mean/variance are undefined
    EmptySignal,

    /// Non-finite or degenerate value inside a feature computation
    Extraction { stage: String, reason: String },
}

impl AnalysisError {
    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        AnalysisError::Decode {
            reason: reason.into(),
        }
    }

    pub(crate) fn extraction(stage: &str, reason: impl Into<String>) -> Self {
        AnalysisError::Extraction {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::Decode { .. } => AnalysisErrorCodes::DECODE,
            AnalysisError::EmptySignal => AnalysisErrorCodes::EMPTY_SIGNAL,
            AnalysisError::Extraction { .. } => AnalysisErrorCodes::EXTRACTION,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::Decode { reason } => format!("Failed to decode audio: {}", reason),
            AnalysisError::EmptySignal => "Decoded audio contains no samples".to_string(),
            AnalysisError::Extraction { stage, reason } => {
                format!("Feature extraction failed in {}: {}", stage, reason)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Decode {
            reason: err.to_string(),
        }
    }
}
