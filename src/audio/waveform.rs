//! Mono waveform handed from the decoder to the feature extractor.

use crate::error::AnalysisError;

/// Immutable mono sample buffer at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap decoded samples
    ///
    /// Fails with `AnalysisError::Decode` for a zero sample rate. An empty
    /// sample buffer is accepted here; the extractor reports it as
    /// `EmptySignal` so the error surfaces where mean/variance are needed.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::decode("sample rate must be > 0"));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Keep only the first `max_samples` samples
    pub fn truncated(mut self, max_samples: usize) -> Self {
        self.samples.truncate(max_samples);
        self
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}
