// Genre Classifier Core - audio feature extraction and genre inference
// Decodes a clip, reduces it to 57 audio statistics and classifies them
// with pretrained artifacts.

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod inference;
pub mod report;

// Re-exports for convenience
pub use analysis::{extract_file, FeatureExtractor, FeatureVector};
pub use audio::Waveform;
pub use config::{AnalysisConfig, AppConfig, ArtifactConfig, PlaybackConfig};
pub use error::{AnalysisError, ClassifyError, ErrorCode, InferenceError, PlaybackError};
pub use inference::{classify_file, InferenceContext, Prediction};

/// Install the tracing subscriber used by the binaries
///
/// Honors `RUST_LOG`, defaulting to `info`. Output goes to stderr so that
/// JSON written to stdout stays machine-readable. Calling this twice is
/// harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
