// FFT module - short-time Fourier analysis and synthesis
//
// Frames are centered: the signal is zero-padded by n_fft / 2 on both sides,
// so frame t is centered on sample t * hop and a signal of N samples yields
// 1 + N / hop frames. The periodic Hann window is used for analysis and
// synthesis, and the inverse transform normalizes by the summed squared
// window so that istft(stft(x)) reconstructs x.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Magnitude (or power) spectrogram, stored frame-major
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    n_bins: usize,
    n_frames: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    pub fn zeros(n_bins: usize, n_frames: usize) -> Self {
        Self {
            n_bins,
            n_frames,
            data: vec![0.0; n_bins * n_frames],
        }
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// All bins of frame `t`
    pub fn frame(&self, t: usize) -> &[f32] {
        &self.data[t * self.n_bins..(t + 1) * self.n_bins]
    }

    pub fn frame_mut(&mut self, t: usize) -> &mut [f32] {
        &mut self.data[t * self.n_bins..(t + 1) * self.n_bins]
    }

    pub fn get(&self, bin: usize, t: usize) -> f32 {
        self.data[t * self.n_bins + bin]
    }

    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.n_bins.max(1))
    }

    /// Flattened values (every bin of every frame)
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            n_bins: self.n_bins,
            n_frames: self.n_frames,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Complex one-sided STFT, stored frame-major
#[derive(Debug, Clone)]
pub struct ComplexSpectrogram {
    n_bins: usize,
    n_frames: usize,
    data: Vec<Complex<f32>>,
}

impl ComplexSpectrogram {
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn frame(&self, t: usize) -> &[Complex<f32>] {
        &self.data[t * self.n_bins..(t + 1) * self.n_bins]
    }

    /// |X|
    pub fn magnitude(&self) -> Spectrogram {
        Spectrogram {
            n_bins: self.n_bins,
            n_frames: self.n_frames,
            data: self.data.iter().map(|c| c.norm()).collect(),
        }
    }

    /// |X|²
    pub fn power(&self) -> Spectrogram {
        Spectrogram {
            n_bins: self.n_bins,
            n_frames: self.n_frames,
            data: self.data.iter().map(|c| c.norm_sqr()).collect(),
        }
    }

    /// Scale every cell by a real-valued mask of the same shape
    pub fn masked(&self, mask: &Spectrogram) -> Self {
        debug_assert_eq!(mask.n_bins, self.n_bins);
        debug_assert_eq!(mask.n_frames, self.n_frames);
        Self {
            n_bins: self.n_bins,
            n_frames: self.n_frames,
            data: self
                .data
                .iter()
                .zip(mask.data.iter())
                .map(|(c, &m)| c * m)
                .collect(),
        }
    }
}

/// Number of centered frames for a signal of `len` samples
pub fn frame_count(len: usize, hop_length: usize) -> usize {
    1 + len / hop_length
}

/// Periodic Hann window (the DFT-even variant used for spectral analysis)
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = (2.0 * std::f64::consts::PI * i as f64) / size as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// FFT processor computing forward and inverse short-time transforms
pub struct StftProcessor {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    n_fft: usize,
    hop_length: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `n_fft` - FFT window size (2048 for music analysis at 22050 Hz)
    /// * `hop_length` - Samples between successive frames
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            forward: planner.plan_fft_forward(n_fft),
            inverse: planner.plan_fft_inverse(n_fft),
            n_fft,
            hop_length: hop_length.max(1),
            window: hann_window(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Compute the centered, zero-padded STFT of `signal`
    ///
    /// # Returns
    /// One-sided complex spectrogram with `n_fft / 2 + 1` bins and
    /// `1 + len / hop` frames
    pub fn stft(&self, signal: &[f32]) -> ComplexSpectrogram {
        let n_bins = self.n_bins();
        let n_frames = frame_count(signal.len(), self.hop_length);
        let pad = (self.n_fft / 2) as isize;

        let mut data = Vec::with_capacity(n_bins * n_frames);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for t in 0..n_frames {
            let start = (t * self.hop_length) as isize - pad;
            for (i, slot) in buffer.iter_mut().enumerate() {
                let idx = start + i as isize;
                let sample = if idx >= 0 && (idx as usize) < signal.len() {
                    signal[idx as usize]
                } else {
                    0.0
                };
                *slot = Complex::new(sample * self.window[i], 0.0);
            }
            self.forward.process(&mut buffer);
            data.extend_from_slice(&buffer[..n_bins]);
        }

        ComplexSpectrogram {
            n_bins,
            n_frames,
            data,
        }
    }

    /// Invert a one-sided STFT produced by [`StftProcessor::stft`]
    ///
    /// Overlap-adds the windowed inverse frames, divides by the summed
    /// squared window wherever it is non-negligible, trims the center
    /// padding and forces the output to exactly `length` samples.
    pub fn istft(&self, spec: &ComplexSpectrogram, length: usize) -> Vec<f32> {
        let n_fft = self.n_fft;
        let hop = self.hop_length;
        let pad = n_fft / 2;

        let padded_length = length + 2 * pad;
        let n_frames = spec.n_frames().min(padded_length.div_ceil(hop));
        if n_frames == 0 {
            return vec![0.0; length];
        }

        let expected_len = n_fft + hop * (n_frames - 1);
        let mut output = vec![0.0f32; expected_len];
        let mut window_sum = vec![0.0f32; expected_len];
        let window_sq: Vec<f32> = self.window.iter().map(|w| w * w).collect();

        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let scale = 1.0 / n_fft as f32;

        for t in 0..n_frames {
            let frame = spec.frame(t);
            fill_hermitian(frame, &mut buffer);
            self.inverse.process(&mut buffer);

            let offset = t * hop;
            for i in 0..n_fft {
                output[offset + i] += buffer[i].re * scale * self.window[i];
                window_sum[offset + i] += window_sq[i];
            }
        }

        for (sample, &norm) in output.iter_mut().zip(window_sum.iter()) {
            if norm > f32::MIN_POSITIVE {
                *sample /= norm;
            }
        }

        let mut trimmed: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        trimmed.resize(length, 0.0);
        trimmed
    }
}

/// Rebuild the full conjugate-symmetric spectrum from its one-sided half
///
/// The imaginary parts of the DC and Nyquist bins are dropped so the inverse
/// transform is real.
fn fill_hermitian(half: &[Complex<f32>], full: &mut [Complex<f32>]) {
    let n = full.len();
    let n_bins = half.len();
    full[0] = Complex::new(half[0].re, 0.0);
    for k in 1..n_bins {
        full[k] = half[k];
    }
    if n % 2 == 0 && n_bins > n / 2 {
        full[n / 2] = Complex::new(half[n / 2].re, 0.0);
    }
    for k in 1..n.div_ceil(2) {
        full[n - k] = half[k].conj();
    }
}
