//! Harmonic-percussive source separation (HPSS)
//!
//! Harmonic content is stable over time and percussive content is spread
//! over frequency. Median-filtering the magnitude spectrogram along time
//! keeps the former; filtering along frequency keeps the latter. Soft masks
//! built from both estimates are applied to the complex STFT and the masked
//! spectra are inverted back to the time domain.

use super::fft::{ComplexSpectrogram, Spectrogram, StftProcessor};

/// Exponent used when building soft masks
const MASK_POWER: i32 = 2;

/// Time-domain harmonic and percussive components
#[derive(Debug, Clone)]
pub struct HpssComponents {
    pub harmonic: Vec<f32>,
    pub percussive: Vec<f32>,
}

/// Separate `stft` (computed from a signal of `length` samples) into
/// harmonic and percussive time-domain signals
///
/// # Arguments
/// * `stft` - Complex STFT of the signal
/// * `processor` - STFT processor used to produce `stft`
/// * `length` - Original signal length, so the outputs align with the input
/// * `kernel_size` - Median filter length (31 by default)
pub fn separate(
    stft: &ComplexSpectrogram,
    processor: &StftProcessor,
    length: usize,
    kernel_size: usize,
) -> HpssComponents {
    let magnitude = stft.magnitude();
    let (harmonic_mask, percussive_mask) = masks(&magnitude, kernel_size);

    HpssComponents {
        harmonic: processor.istft(&stft.masked(&harmonic_mask), length),
        percussive: processor.istft(&stft.masked(&percussive_mask), length),
    }
}

/// Soft masks (harmonic, percussive) for a magnitude spectrogram
pub fn masks(magnitude: &Spectrogram, kernel_size: usize) -> (Spectrogram, Spectrogram) {
    let harmonic = median_filter_time(magnitude, kernel_size);
    let percussive = median_filter_frequency(magnitude, kernel_size);

    let harmonic_mask = soft_mask(&harmonic, &percussive);
    let percussive_mask = soft_mask(&percussive, &harmonic);
    (harmonic_mask, percussive_mask)
}

/// Wiener-style soft mask `X^p / (X^p + R^p)`
///
/// Cells where both inputs vanish get 0 in either mask, so isolated energy
/// is dropped rather than split between the components.
fn soft_mask(x: &Spectrogram, reference: &Spectrogram) -> Spectrogram {
    let mut mask = Spectrogram::zeros(x.n_bins(), x.n_frames());
    for t in 0..x.n_frames() {
        let out = mask.frame_mut(t);
        for (bin, value) in out.iter_mut().enumerate() {
            let a = x.get(bin, t);
            let b = reference.get(bin, t);
            let z = a.max(b);
            *value = if z < f32::MIN_POSITIVE {
                0.0
            } else {
                let ma = (a / z).powi(MASK_POWER);
                let mb = (b / z).powi(MASK_POWER);
                ma / (ma + mb)
            };
        }
    }
    mask
}

/// Index into `0..len` with half-sample symmetric reflection at both ends
fn reflect(index: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let m = index.rem_euclid(period);
    if m >= len as isize {
        (period - 1 - m) as usize
    } else {
        m as usize
    }
}

/// Median of the window of `kernel_size` values centered on every element
fn median_filter_1d(input: &[f32], kernel_size: usize, output: &mut [f32], scratch: &mut Vec<f32>) {
    let half = (kernel_size / 2) as isize;
    let len = input.len();
    for (i, out) in output.iter_mut().enumerate() {
        scratch.clear();
        for offset in -half..(kernel_size as isize - half) {
            scratch.push(input[reflect(i as isize + offset, len)]);
        }
        let mid = scratch.len() / 2;
        let (_, &mut median, _) = scratch.select_nth_unstable_by(mid, f32::total_cmp);
        *out = median;
    }
}

/// Median filter along the time axis (per frequency bin)
fn median_filter_time(spec: &Spectrogram, kernel_size: usize) -> Spectrogram {
    let n_frames = spec.n_frames();
    let mut filtered = Spectrogram::zeros(spec.n_bins(), n_frames);
    let mut row = vec![0.0f32; n_frames];
    let mut smoothed = vec![0.0f32; n_frames];
    let mut scratch = Vec::with_capacity(kernel_size);

    for bin in 0..spec.n_bins() {
        for (t, value) in row.iter_mut().enumerate() {
            *value = spec.get(bin, t);
        }
        median_filter_1d(&row, kernel_size, &mut smoothed, &mut scratch);
        for (t, &value) in smoothed.iter().enumerate() {
            filtered.frame_mut(t)[bin] = value;
        }
    }
    filtered
}

/// Median filter along the frequency axis (per frame)
fn median_filter_frequency(spec: &Spectrogram, kernel_size: usize) -> Spectrogram {
    let mut filtered = Spectrogram::zeros(spec.n_bins(), spec.n_frames());
    let mut scratch = Vec::with_capacity(kernel_size);
    for t in 0..spec.n_frames() {
        median_filter_1d(spec.frame(t), kernel_size, filtered.frame_mut(t), &mut scratch);
    }
    filtered
}
