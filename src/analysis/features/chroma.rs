// Chroma module - pitch-class energy from a power spectrogram
//
// Each FFT bin is mapped onto the 12 pitch classes with a Gaussian bump in
// octave space, weighted towards the middle of the audible range, and the
// per-frame result is normalized so the strongest pitch class is 1.
//
// Before building the filterbank the recording's deviation from A440 is
// estimated from interpolated spectral peaks so that slightly detuned
// recordings still land on the right pitch classes.

use super::fft::Spectrogram;
use super::spectral::fft_frequencies;
use super::stats::median;

pub const N_CHROMA: usize = 12;

/// Center octave of the octave weighting window
const CENTER_OCTAVE: f64 = 5.0;
/// Gaussian half-width (in octaves) of the octave weighting window
const OCTAVE_WIDTH: f64 = 2.0;

/// Peak picking range for tuning estimation
const TUNING_FMIN: f32 = 150.0;
const TUNING_FMAX: f32 = 4000.0;
/// Peaks below this fraction of the frame maximum are ignored
const TUNING_THRESHOLD: f32 = 0.1;
/// Histogram resolution, in fractions of a chroma bin
const TUNING_RESOLUTION: f64 = 0.01;

/// Fractional octave number of `hz` relative to C0 (A440 / 16)
fn hz_to_octs(hz: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    let a440 = 440.0 * 2f64.powf(tuning / bins_per_octave as f64);
    (hz / (a440 / 16.0)).log2()
}

/// Chroma filterbank (`N_CHROMA × n_bins`)
#[derive(Debug, Clone)]
pub struct ChromaFilterbank {
    n_bins: usize,
    weights: Vec<f32>,
}

impl ChromaFilterbank {
    /// Build the filterbank for a given tuning offset (fractions of a bin)
    pub fn new(sample_rate: u32, n_fft: usize, tuning: f32) -> Self {
        let n_chroma = N_CHROMA as f64;
        let tuning = tuning as f64;

        // Fractional chroma bin of every FFT bin; DC gets a placeholder
        // 1.5 octaves below bin 1
        let mut frqbins = Vec::with_capacity(n_fft);
        for i in 1..n_fft {
            let hz = i as f64 * sample_rate as f64 / n_fft as f64;
            frqbins.push(n_chroma * hz_to_octs(hz, tuning, N_CHROMA));
        }
        let dc = frqbins.first().copied().unwrap_or(0.0) - 1.5 * n_chroma;
        frqbins.insert(0, dc);

        let mut binwidth: Vec<f64> = frqbins
            .windows(2)
            .map(|w| (w[1] - w[0]).max(1.0))
            .collect();
        binwidth.push(1.0);

        let half = (n_chroma / 2.0).round();
        let mut wts = vec![vec![0.0f64; n_fft]; N_CHROMA];
        for (c, row) in wts.iter_mut().enumerate() {
            for (j, w) in row.iter_mut().enumerate() {
                let d = (frqbins[j] - c as f64 + half + 10.0 * n_chroma).rem_euclid(n_chroma) - half;
                *w = (-0.5 * (2.0 * d / binwidth[j]).powi(2)).exp();
            }
        }

        // L2-normalize each column, then apply the octave weighting
        for j in 0..n_fft {
            let norm = wts.iter().map(|row| row[j] * row[j]).sum::<f64>().sqrt();
            let octave_weight =
                (-0.5 * ((frqbins[j] / n_chroma - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();
            for row in wts.iter_mut() {
                if norm > f64::MIN_POSITIVE {
                    row[j] /= norm;
                }
                row[j] *= octave_weight;
            }
        }

        // Rotate so that chroma bin 0 is C rather than A
        let n_bins = n_fft / 2 + 1;
        let mut weights = Vec::with_capacity(N_CHROMA * n_bins);
        for c in 0..N_CHROMA {
            let source = &wts[(c + 3) % N_CHROMA];
            weights.extend(source[..n_bins].iter().map(|&w| w as f32));
        }

        Self { n_bins, weights }
    }

    pub fn row(&self, c: usize) -> &[f32] {
        &self.weights[c * self.n_bins..(c + 1) * self.n_bins]
    }

    /// Chromagram of a power spectrogram, max-normalized per frame
    pub fn apply(&self, power: &Spectrogram) -> Spectrogram {
        debug_assert_eq!(power.n_bins(), self.n_bins);
        let mut chroma = Spectrogram::zeros(N_CHROMA, power.n_frames());
        for t in 0..power.n_frames() {
            let frame = power.frame(t);
            let out = chroma.frame_mut(t);
            for (c, value) in out.iter_mut().enumerate() {
                *value = self
                    .row(c)
                    .iter()
                    .zip(frame.iter())
                    .map(|(&w, &p)| w * p)
                    .sum();
            }

            let peak = out.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()));
            if peak > f32::MIN_POSITIVE {
                out.iter_mut().for_each(|v| *v /= peak);
            }
        }
        chroma
    }
}

/// Estimate the tuning offset of a recording (fractions of a chroma bin)
///
/// Peaks of every frame between 150 Hz and 4 kHz are located by parabolic
/// interpolation. Peaks whose magnitude reaches the median peak magnitude
/// vote in a histogram of deviations from the equal-tempered grid; the
/// most popular histogram bin wins. Returns 0.0 when no peak qualifies.
pub fn estimate_tuning(spectrum: &Spectrogram, sample_rate: u32, n_fft: usize) -> f32 {
    let freqs = fft_frequencies(sample_rate, n_fft);
    let n_bins = spectrum.n_bins();
    let bin_hz = sample_rate as f32 / n_fft as f32;

    let mut pitches = Vec::new();
    let mut magnitudes = Vec::new();
    let mut thresholded = vec![0.0f32; n_bins];

    for frame in spectrum.frames() {
        let peak = frame.iter().copied().fold(0.0f32, f32::max);
        let reference = TUNING_THRESHOLD * peak;
        for (dst, &s) in thresholded.iter_mut().zip(frame.iter()) {
            *dst = if s > reference { s } else { 0.0 };
        }

        for k in 1..n_bins.saturating_sub(1) {
            if !(TUNING_FMIN <= freqs[k] && freqs[k] < TUNING_FMAX) {
                continue;
            }
            let is_peak = thresholded[k] > thresholded[k - 1] && thresholded[k] >= thresholded[k + 1];
            if !is_peak {
                continue;
            }

            let avg = 0.5 * (frame[k + 1] - frame[k - 1]);
            let curvature = 2.0 * frame[k] - frame[k + 1] - frame[k - 1];
            let denom = if curvature.abs() < f32::MIN_POSITIVE {
                curvature + 1.0
            } else {
                curvature
            };
            let shift = avg / denom;

            let pitch = (k as f32 + shift) * bin_hz;
            if pitch > 0.0 {
                pitches.push(pitch);
                magnitudes.push(frame[k] + 0.5 * avg * shift);
            }
        }
    }

    if pitches.is_empty() {
        return 0.0;
    }

    let threshold = median(&mut magnitudes.clone()).unwrap_or(0.0);
    let selected: Vec<f32> = pitches
        .iter()
        .zip(magnitudes.iter())
        .filter(|(_, mag)| **mag >= threshold)
        .map(|(pitch, _)| *pitch)
        .collect();

    pitch_tuning(&selected)
}

/// Most common deviation of `frequencies` from the equal-tempered grid
fn pitch_tuning(frequencies: &[f32]) -> f32 {
    let n_hist = (1.0 / TUNING_RESOLUTION).ceil() as usize;
    let edge = |i: usize| -0.5 + i as f64 * TUNING_RESOLUTION;
    let mut counts = vec![0usize; n_hist];

    let mut any = false;
    for &hz in frequencies.iter().filter(|&&hz| hz > 0.0) {
        any = true;
        let mut residual = (N_CHROMA as f64 * hz_to_octs(hz as f64, 0.0, N_CHROMA)).rem_euclid(1.0);
        if residual >= 0.5 {
            residual -= 1.0;
        }

        let mut idx = ((residual + 0.5) / TUNING_RESOLUTION).floor() as isize;
        idx = idx.clamp(0, n_hist as isize - 1);
        let mut idx = idx as usize;
        if residual < edge(idx) && idx > 0 {
            idx -= 1;
        } else if idx + 1 < n_hist && residual >= edge(idx + 1) {
            idx += 1;
        }
        counts[idx] += 1;
    }

    if !any {
        return 0.0;
    }

    let best = counts
        .iter()
        .enumerate()
        .fold((0, 0), |best, (i, &count)| if count > best.1 { (i, count) } else { best })
        .0;
    edge(best) as f32
}
