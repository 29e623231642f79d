// Tempo module - global tempo estimate from an onset strength envelope
//
// The onset envelope is the positive first difference of the dB mel
// spectrogram, reduced across mel bands with a median. Its windowed
// autocorrelation (the tempogram) is averaged over the clip, weighted by a
// log-normal prior around the starting tempo, and the strongest lag is
// converted back to beats per minute.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::fft::{hann_window, Spectrogram};
use super::stats::median;

/// Prior standard deviation, in octaves
const STD_BPM: f64 = 1.0;

/// Scale applied to the tempogram before the log compression
const TEMPOGRAM_GAIN: f64 = 1e6;

/// Leading frames prepended to the onset envelope so onsets line up with
/// centered STFT frames (lag + n_fft / (2 · hop))
fn onset_offset(n_fft: usize, hop_length: usize) -> usize {
    1 + n_fft / (2 * hop_length)
}

/// Tempo estimator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoParams {
    pub start_bpm: f32,
    pub max_tempo_bpm: f32,
    pub window_secs: f32,
}

impl Default for TempoParams {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            max_tempo_bpm: 320.0,
            window_secs: 8.0,
        }
    }
}

/// Autocorrelation tempo estimator
pub struct TempoEstimator {
    sample_rate: u32,
    n_fft: usize,
    hop_length: usize,
    params: TempoParams,
    win_length: usize,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl TempoEstimator {
    pub fn new(sample_rate: u32, n_fft: usize, hop_length: usize, params: TempoParams) -> Self {
        let hop_length = hop_length.max(1);
        let window_samples = (params.window_secs as f64 * sample_rate as f64).floor() as usize;
        let win_length = (window_samples / hop_length).max(1);

        let fft_len = 2 * win_length;
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        Self {
            sample_rate,
            n_fft,
            hop_length,
            params,
            win_length,
            window: hann_window(win_length).into_iter().map(f64::from).collect(),
            forward,
            inverse,
        }
    }

    /// Autocorrelation window, in onset frames
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// Onset strength envelope of a dB mel spectrogram
    ///
    /// One value per spectrogram frame. The first frames are zero (onset
    /// alignment), the rest are the median across mel bands of the positive
    /// frame-to-frame increase.
    pub fn onset_strength(&self, mel_db: &Spectrogram) -> Vec<f32> {
        let n_frames = mel_db.n_frames();
        let mut envelope = vec![0.0f32; onset_offset(self.n_fft, self.hop_length)];
        let mut diffs = vec![0.0f32; mel_db.n_bins()];

        for t in 1..n_frames {
            let previous = mel_db.frame(t - 1);
            let current = mel_db.frame(t);
            for ((d, &cur), &prev) in diffs.iter_mut().zip(current).zip(previous) {
                *d = (cur - prev).max(0.0);
            }
            envelope.push(median(&mut diffs).unwrap_or(0.0));
        }

        envelope.truncate(n_frames);
        envelope
    }

    /// Tempo (BPM) at each autocorrelation lag; lag 0 is infinite
    pub fn tempo_frequencies(&self) -> Vec<f64> {
        let frames_per_minute = 60.0 * self.sample_rate as f64 / self.hop_length as f64;
        (0..self.win_length)
            .map(|lag| {
                if lag == 0 {
                    f64::INFINITY
                } else {
                    frames_per_minute / lag as f64
                }
            })
            .collect()
    }

    /// Time-averaged, per-frame max-normalized autocorrelation tempogram
    pub fn mean_tempogram(&self, onset: &[f32]) -> Vec<f64> {
        let n = onset.len();
        let w = self.win_length;
        let half = w / 2;
        let padded = linear_ramp_pad(onset, half);
        let fft_len = 2 * w;

        let mut mean = vec![0.0f64; w];
        let mut buffer = vec![Complex::new(0.0f64, 0.0); fft_len];
        let mut acf = vec![0.0f64; w];

        for t in 0..n {
            let frame = &padded[t..(t + w).min(padded.len())];
            buffer.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
            for ((slot, &x), &win) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(x * win, 0.0);
            }

            self.forward.process(&mut buffer);
            for c in buffer.iter_mut() {
                *c = Complex::new(c.norm_sqr(), 0.0);
            }
            self.inverse.process(&mut buffer);

            for (dst, c) in acf.iter_mut().zip(&buffer) {
                *dst = c.re / fft_len as f64;
            }

            let peak = acf.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()));
            let norm = if peak > f64::MIN_POSITIVE { peak } else { 1.0 };
            for (m, &v) in mean.iter_mut().zip(&acf) {
                *m += v / norm;
            }
        }

        if n > 0 {
            mean.iter_mut().for_each(|m| *m /= n as f64);
        }
        mean
    }

    /// Estimate the global tempo of an onset envelope, in BPM
    ///
    /// Returns 0.0 when the envelope carries no onsets at all.
    pub fn estimate(&self, onset: &[f32]) -> f32 {
        if onset.iter().all(|&v| v == 0.0) {
            return 0.0;
        }

        let tempogram = self.mean_tempogram(onset);
        let bpms = self.tempo_frequencies();
        let log_start = (self.params.start_bpm as f64).log2();

        // Lags faster than the tempo ceiling are never candidates
        let first_allowed = bpms
            .iter()
            .position(|&bpm| bpm < self.params.max_tempo_bpm as f64)
            .unwrap_or(0);

        let mut best: Option<(usize, f64)> = None;
        for (lag, (&tg, &bpm)) in tempogram.iter().zip(&bpms).enumerate().skip(first_allowed) {
            let prior = -0.5 * ((bpm.log2() - log_start) / STD_BPM).powi(2);
            let score = (TEMPOGRAM_GAIN * tg).ln_1p() + prior;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((lag, score));
            }
        }

        best.map_or(0.0, |(lag, _)| bpms[lag] as f32)
    }
}

/// Pad both ends with `pad` values ramping linearly from 0 to the edge sample
fn linear_ramp_pad(signal: &[f32], pad: usize) -> Vec<f64> {
    let mut padded = Vec::with_capacity(signal.len() + 2 * pad);
    let first = signal.first().copied().unwrap_or(0.0) as f64;
    let last = signal.last().copied().unwrap_or(0.0) as f64;
    let width = pad.max(1) as f64;

    padded.extend((0..pad).map(|i| first * i as f64 / width));
    padded.extend(signal.iter().map(|&x| x as f64));
    padded.extend((0..pad).map(|j| last * (pad - 1 - j) as f64 / width));
    padded
}
