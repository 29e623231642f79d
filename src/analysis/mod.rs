// Analysis module - audio file to feature vector

pub mod features;

pub use features::{FeatureExtractor, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

use std::path::Path;

use crate::audio::load_waveform;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Decode `path` and extract its feature vector
pub fn extract_file(path: &Path, config: &AnalysisConfig) -> Result<FeatureVector, AnalysisError> {
    let extractor = FeatureExtractor::new(config.clone())?;
    let waveform = load_waveform(path, config)?;
    tracing::info!(
        "[Analysis] Extracting features from {} ({:.1}s)",
        path.display(),
        waveform.duration_secs()
    );
    extractor.extract(&waveform)
}
