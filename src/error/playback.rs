// Playback error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Playback error code constants
///
/// Error code range: 5001-5003
pub struct PlaybackErrorCodes {}

impl PlaybackErrorCodes {
    /// No default output device available
    pub const NO_OUTPUT_DEVICE: i32 = 5001;

    /// Output stream could not be built or started
    pub const STREAM_FAILED: i32 = 5002;

    /// The preview audio could not be decoded
    pub const DECODE: i32 = 5003;
}

/// Log a playback error
///
/// Playback is a side channel: failures are reported at warn level and
/// never escalate into a prediction failure.
pub fn log_playback_error(err: &PlaybackError, context: &str) {
    warn!(
        "Playback error in {}: code={}, component=PreviewPlayer, message={}",
        context,
        err.code(),
        err.message()
    );
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    NoOutputDevice,
    StreamFailed { reason: String },
    Decode { reason: String },
}

impl ErrorCode for PlaybackError {
    fn code(&self) -> i32 {
        match self {
            PlaybackError::NoOutputDevice => PlaybackErrorCodes::NO_OUTPUT_DEVICE,
            PlaybackError::StreamFailed { .. } => PlaybackErrorCodes::STREAM_FAILED,
            PlaybackError::Decode { .. } => PlaybackErrorCodes::DECODE,
        }
    }

    fn message(&self) -> String {
        match self {
            PlaybackError::NoOutputDevice => "No default output device found".to_string(),
            PlaybackError::StreamFailed { reason } => {
                format!("Failed to open output stream: {}", reason)
            }
            PlaybackError::Decode { reason } => {
                format!("Failed to decode preview audio: {}", reason)
            }
        }
    }
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlaybackError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PlaybackError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_error_codes() {
        assert_eq!(PlaybackError::NoOutputDevice.code(), 5001);
        assert_eq!(
            PlaybackError::StreamFailed {
                reason: "busy".to_string()
            }
            .code(),
            5002
        );
        assert_eq!(
            PlaybackError::Decode {
                reason: "eof".to_string()
            }
            .code(),
            5003
        );
    }
}
