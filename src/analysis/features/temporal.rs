// Temporal module - Time-domain feature extraction
//
// This module computes frame-wise features directly from the waveform:
// root-mean-square energy and zero-crossing rate. Frames are centered on
// multiples of the hop, like the STFT frames, so every descriptor has the
// same frame count.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

use super::fft::frame_count;

/// Amplitudes at or below this are treated as exact zeros for ZCR
const ZCR_THRESHOLD: f32 = 1e-10;

/// Padding applied before framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PadMode {
    /// Pad with zeros
    Constant,
    /// Repeat the first/last sample
    Edge,
}

/// Temporal feature computation functions
pub struct TemporalFeatures {
    frame_length: usize,
    hop_length: usize,
}

impl TemporalFeatures {
    /// Create a new temporal features processor
    ///
    /// # Arguments
    /// * `frame_length` - Samples per analysis frame (2048 by default)
    /// * `hop_length` - Samples between frame centers
    pub fn new(frame_length: usize, hop_length: usize) -> Self {
        Self {
            frame_length: frame_length.max(1),
            hop_length: hop_length.max(1),
        }
    }

    /// Compute zero-crossing rate (ZCR) of one frame
    ///
    /// Samples with |x| ≤ 1e-10 count as zero and zero counts as positive.
    /// A crossing is a change of sign between consecutive samples; the
    /// first sample never counts. The count is normalized by the frame
    /// length.
    ///
    /// # Returns
    /// Zero-crossing rate (0.0 to 1.0)
    pub fn compute_zcr(&self, frame: &[f32]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }

        let negative = |x: f32| x.abs() > ZCR_THRESHOLD && x < 0.0;
        let crossings = frame
            .windows(2)
            .filter(|pair| negative(pair[0]) != negative(pair[1]))
            .count();

        crossings as f32 / frame.len() as f32
    }

    /// Root-mean-square amplitude of one frame
    pub fn compute_rms(&self, frame: &[f32]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let power: f64 = frame.iter().map(|&x| (x as f64) * (x as f64)).sum();
        (power / frame.len() as f64).sqrt() as f32
    }

    /// Frame-wise ZCR over the whole signal (edge padding)
    pub fn zero_crossing_rate(&self, signal: &[f32]) -> Vec<f32> {
        self.framed(signal, PadMode::Edge, |frame| self.compute_zcr(frame))
    }

    /// Frame-wise RMS energy over the whole signal (zero padding)
    pub fn rms(&self, signal: &[f32]) -> Vec<f32> {
        self.framed(signal, PadMode::Constant, |frame| self.compute_rms(frame))
    }

    fn framed(&self, signal: &[f32], mode: PadMode, f: impl Fn(&[f32]) -> f32) -> Vec<f32> {
        if signal.is_empty() {
            return Vec::new();
        }

        let n_frames = frame_count(signal.len(), self.hop_length);
        let padded = pad_centered(signal, self.frame_length / 2, mode);

        (0..n_frames)
            .map(|t| {
                let start = t * self.hop_length;
                let end = (start + self.frame_length).min(padded.len());
                f(&padded[start..end])
            })
            .collect()
    }
}

fn pad_centered(signal: &[f32], pad: usize, mode: PadMode) -> Vec<f32> {
    let (left, right) = match mode {
        PadMode::Constant => (0.0, 0.0),
        PadMode::Edge => (signal[0], signal[signal.len() - 1]),
    };

    let mut padded = Vec::with_capacity(signal.len() + 2 * pad);
    padded.resize(pad, left);
    padded.extend_from_slice(signal);
    padded.resize(signal.len() + 2 * pad, right);
    padded
}
