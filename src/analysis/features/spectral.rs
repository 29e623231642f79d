// Spectral module - Frequency-domain feature extraction
//
// This module computes per-frame spectral shape descriptors from magnitude
// spectrograms. Every function returns one value per STFT frame; the
// extractor reduces them to mean/variance afterwards.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

use super::fft::Spectrogram;

/// Default spectral rolloff threshold (85% of spectral magnitude)
pub const ROLLOFF_THRESHOLD: f32 = 0.85;

/// Spectral feature computation functions
pub struct SpectralFeatures {
    /// Center frequency of every FFT bin
    frequencies: Vec<f32>,
    rolloff_percent: f32,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `n_fft` - FFT window size
    pub fn new(sample_rate: u32, n_fft: usize) -> Self {
        Self {
            frequencies: fft_frequencies(sample_rate, n_fft),
            rolloff_percent: ROLLOFF_THRESHOLD,
        }
    }

    pub fn with_rolloff_percent(mut self, rolloff_percent: f32) -> Self {
        self.rolloff_percent = rolloff_percent.clamp(0.0, 1.0);
        self
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]|
    ///
    /// The spectral centroid represents the "center of mass" of the spectrum,
    /// and is a measure of the brightness of a sound.
    ///
    /// # Returns
    /// Spectral centroid in Hz (0 for a silent frame)
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let magnitude_sum: f32 = spectrum.iter().sum();
        if magnitude_sum <= 1e-10 {
            return 0.0;
        }

        let weighted_sum: f32 = spectrum
            .iter()
            .zip(self.frequencies.iter())
            .map(|(&mag, &freq)| freq * mag)
            .sum();

        weighted_sum / magnitude_sum
    }

    /// Compute spectral bandwidth (second-order spread around the centroid)
    ///
    /// Formula: bandwidth = sqrt(Σ (|X[i]| / Σ|X|) × (f_i - centroid)²)
    pub fn compute_bandwidth(&self, spectrum: &[f32], centroid: f32) -> f32 {
        let magnitude_sum: f32 = spectrum.iter().sum();
        if magnitude_sum <= 1e-10 {
            return 0.0;
        }

        let spread: f32 = spectrum
            .iter()
            .zip(self.frequencies.iter())
            .map(|(&mag, &freq)| (mag / magnitude_sum) * (freq - centroid).powi(2))
            .sum();

        spread.sqrt()
    }

    /// Compute spectral rolloff
    ///
    /// Finds the lowest bin frequency at which the cumulative magnitude
    /// reaches `rolloff_percent` of the frame total.
    ///
    /// # Returns
    /// Rolloff frequency in Hz (0 for a silent frame)
    pub fn compute_rolloff(&self, spectrum: &[f32]) -> f32 {
        let total: f32 = spectrum.iter().sum();
        let threshold = self.rolloff_percent * total;

        let mut cumulative = 0.0;
        for (&mag, &freq) in spectrum.iter().zip(self.frequencies.iter()) {
            cumulative += mag;
            if cumulative >= threshold {
                return freq;
            }
        }

        // Rounding can leave the running sum a hair below the threshold
        self.frequencies
            .get(spectrum.len().saturating_sub(1))
            .copied()
            .unwrap_or(0.0)
    }

    /// Per-frame centroid, bandwidth and rolloff of a magnitude spectrogram
    pub fn compute_all(&self, magnitude: &Spectrogram) -> SpectralShape {
        let mut shape = SpectralShape::with_capacity(magnitude.n_frames());
        for frame in magnitude.frames() {
            let centroid = self.compute_centroid(frame);
            shape.centroid.push(centroid);
            shape
                .bandwidth
                .push(self.compute_bandwidth(frame, centroid));
            shape.rolloff.push(self.compute_rolloff(frame));
        }
        shape
    }
}

/// Per-frame spectral shape descriptors
#[derive(Debug, Clone, Default)]
pub struct SpectralShape {
    pub centroid: Vec<f32>,
    pub bandwidth: Vec<f32>,
    pub rolloff: Vec<f32>,
}

impl SpectralShape {
    fn with_capacity(frames: usize) -> Self {
        Self {
            centroid: Vec::with_capacity(frames),
            bandwidth: Vec::with_capacity(frames),
            rolloff: Vec::with_capacity(frames),
        }
    }
}

/// Center frequency (Hz) of each one-sided FFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f32> {
    let bin_width = sample_rate as f64 / n_fft as f64;
    (0..=n_fft / 2).map(|i| (i as f64 * bin_width) as f32).collect()
}
