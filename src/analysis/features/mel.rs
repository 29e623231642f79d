// Mel module - mel filterbank, decibel scaling and cepstral coefficients
//
// The filterbank uses the Slaney mel scale (linear below 1 kHz, logarithmic
// above) with area normalization, so each triangle integrates to roughly
// the same energy. MFCCs are the orthonormal DCT-II of the dB-scaled mel
// power spectrogram.

use super::fft::Spectrogram;
use super::spectral::fft_frequencies;

/// Floor applied before taking logarithms
const AMIN: f32 = 1e-10;

/// Dynamic range kept below the loudest cell
const TOP_DB: f32 = 80.0;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`
fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let min_mel = hz_to_mel(fmin);
    let max_mel = hz_to_mel(fmax);
    let step = if n > 1 {
        (max_mel - min_mel) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(|i| mel_to_hz(min_mel + step * i as f64)).collect()
}

/// Triangular mel filterbank projecting an FFT spectrum onto mel bands
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    n_mels: usize,
    n_bins: usize,
    /// Row-major `n_mels × n_bins`
    weights: Vec<f32>,
}

impl MelFilterbank {
    /// Build a Slaney-normalized filterbank spanning 0 Hz to Nyquist
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let fft_freqs = fft_frequencies(sample_rate, n_fft);
        let n_bins = fft_freqs.len();
        let mel_f = mel_frequencies(n_mels + 2, 0.0, sample_rate as f64 / 2.0);

        let mut weights = vec![0.0f32; n_mels * n_bins];
        for m in 0..n_mels {
            let lower_width = mel_f[m + 1] - mel_f[m];
            let upper_width = mel_f[m + 2] - mel_f[m + 1];
            let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);

            let row = &mut weights[m * n_bins..(m + 1) * n_bins];
            for (w, &freq) in row.iter_mut().zip(fft_freqs.iter()) {
                let freq = freq as f64;
                let lower = (freq - mel_f[m]) / lower_width;
                let upper = (mel_f[m + 2] - freq) / upper_width;
                *w = (lower.min(upper).max(0.0) * enorm) as f32;
            }
        }

        Self {
            n_mels,
            n_bins,
            weights,
        }
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn row(&self, m: usize) -> &[f32] {
        &self.weights[m * self.n_bins..(m + 1) * self.n_bins]
    }

    /// Project a power spectrogram onto the mel bands
    pub fn apply(&self, power: &Spectrogram) -> Spectrogram {
        debug_assert_eq!(power.n_bins(), self.n_bins);
        let mut mel = Spectrogram::zeros(self.n_mels, power.n_frames());
        for t in 0..power.n_frames() {
            let frame = power.frame(t);
            let out = mel.frame_mut(t);
            for (m, value) in out.iter_mut().enumerate() {
                *value = self
                    .row(m)
                    .iter()
                    .zip(frame.iter())
                    .map(|(&w, &p)| w * p)
                    .sum();
            }
        }
        mel
    }
}

/// Convert a power spectrogram to decibels (ref = 1.0)
///
/// Values are floored at 1e-10 before the logarithm and the result is
/// clamped to within 80 dB of the loudest cell.
pub fn power_to_db(power: &Spectrogram) -> Spectrogram {
    let db = power.map(|p| 10.0 * p.max(AMIN).log10());
    let peak = db
        .values()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    db.map(|v| v.max(floor))
}

/// Orthonormal DCT-II basis truncated to `n_coeffs` rows
#[derive(Debug, Clone)]
pub struct DctBasis {
    n_coeffs: usize,
    n_inputs: usize,
    basis: Vec<f32>,
}

impl DctBasis {
    pub fn new(n_coeffs: usize, n_inputs: usize) -> Self {
        let n = n_inputs as f64;
        let mut basis = Vec::with_capacity(n_coeffs * n_inputs);
        for k in 0..n_coeffs {
            let scale = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            for i in 0..n_inputs {
                let angle = std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n);
                basis.push((scale * angle.cos()) as f32);
            }
        }
        Self {
            n_coeffs,
            n_inputs,
            basis,
        }
    }

    fn row(&self, k: usize) -> &[f32] {
        &self.basis[k * self.n_inputs..(k + 1) * self.n_inputs]
    }

    /// Transform every frame of a dB mel spectrogram into cepstral coefficients
    ///
    /// # Returns
    /// Spectrogram with `n_coeffs` rows (one per coefficient) per frame
    pub fn apply(&self, mel_db: &Spectrogram) -> Spectrogram {
        debug_assert_eq!(mel_db.n_bins(), self.n_inputs);
        let mut mfcc = Spectrogram::zeros(self.n_coeffs, mel_db.n_frames());
        for t in 0..mel_db.n_frames() {
            let frame = mel_db.frame(t);
            let out = mfcc.frame_mut(t);
            for (k, value) in out.iter_mut().enumerate() {
                let acc: f64 = self
                    .row(k)
                    .iter()
                    .zip(frame.iter())
                    .map(|(&b, &x)| b as f64 * x as f64)
                    .sum();
                *value = acc as f32;
            }
        }
        mfcc
    }
}
