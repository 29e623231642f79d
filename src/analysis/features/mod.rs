// FeatureExtractor - DSP feature extraction for genre classification
//
// This module turns a mono waveform into the fixed 57-value feature vector
// the genre classifier was trained on. Every frame-based descriptor is
// reduced to its mean and population variance; tempo is a single global
// estimate.
//
// Module organization:
// - types: FeatureVector, column names, per-descriptor summaries
// - fft: STFT/ISTFT and spectrogram containers
// - spectral: centroid, bandwidth, rolloff
// - temporal: RMS energy and zero-crossing rate
// - chroma: pitch-class filterbank and tuning estimation
// - mel: mel filterbank, dB scaling, DCT for MFCCs
// - hpss: harmonic/percussive separation
// - tempo: onset strength and autocorrelation tempo estimate
// - stats: mean/variance and median reductions
// - mod.rs: Coordinator (FeatureExtractor)
//
// Vector layout (57 values):
// 1-12.  chroma, rms, centroid, bandwidth, rolloff, zcr (mean, var each)
// 13-16. harmonic and percussive signals (mean, var each)
// 17.    tempo (BPM)
// 18-57. mfcc1..mfcc20 (mean, var each)

pub mod chroma;
pub mod fft;
pub mod hpss;
pub mod mel;
pub mod spectral;
pub mod stats;
pub mod temporal;
pub mod tempo;
mod types;

pub use types::{
    FeatureSummary, FeatureVector, Summary, FEATURE_COUNT, FEATURE_NAMES, N_MFCC, TEMPO_INDEX,
};

use std::time::Instant;

use crate::audio::Waveform;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

use chroma::{estimate_tuning, ChromaFilterbank};
use fft::{Spectrogram, StftProcessor};
use mel::{power_to_db, DctBasis, MelFilterbank};
use spectral::SpectralFeatures;
use temporal::TemporalFeatures;
use tempo::{TempoEstimator, TempoParams};

/// Components that depend on the sample rate
struct RateBank {
    sample_rate: u32,
    spectral: SpectralFeatures,
    mel: MelFilterbank,
    tempo: TempoEstimator,
}

impl RateBank {
    fn new(sample_rate: u32, config: &AnalysisConfig) -> Self {
        let params = TempoParams {
            start_bpm: config.start_bpm,
            max_tempo_bpm: config.max_tempo_bpm,
            window_secs: config.tempo_window_secs,
        };
        Self {
            sample_rate,
            spectral: SpectralFeatures::new(sample_rate, config.n_fft)
                .with_rolloff_percent(config.rolloff_percent),
            mel: MelFilterbank::new(sample_rate, config.n_fft, config.n_mels),
            tempo: TempoEstimator::new(sample_rate, config.n_fft, config.hop_length, params),
        }
    }
}

/// FeatureExtractor coordinates the DSP feature extraction pipeline
///
/// Filterbanks and FFT plans are built once for the configured sample rate
/// and reused for every clip. The extractor holds no per-clip state, so one
/// instance can serve every request.
pub struct FeatureExtractor {
    config: AnalysisConfig,
    stft: StftProcessor,
    temporal: TemporalFeatures,
    dct: DctBasis,
    bank: RateBank,
}

impl FeatureExtractor {
    /// Create a new FeatureExtractor for the given analysis parameters
    ///
    /// # Errors
    /// * `Extraction` (stage `config`) - the parameters fail
    ///   `AnalysisConfig::validate`
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config
            .validate()
            .map_err(|reason| AnalysisError::extraction("config", reason))?;

        Ok(Self {
            stft: StftProcessor::new(config.n_fft, config.hop_length),
            temporal: TemporalFeatures::new(config.n_fft, config.hop_length),
            dct: DctBasis::new(config.n_mfcc, config.n_mels),
            bank: RateBank::new(config.sample_rate, &config),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Extract the 57-value feature vector from a waveform
    ///
    /// Only the first `max_duration_secs` of the waveform are analysed.
    ///
    /// # Errors
    /// * `EmptySignal` - the waveform has no samples
    /// * `Extraction` - a descriptor came out empty or non-finite
    pub fn extract(&self, waveform: &Waveform) -> Result<FeatureVector, AnalysisError> {
        let summary = self.summarize(waveform)?;
        let vector = summary.into_vector();

        if let Some(name) = vector.first_non_finite() {
            return Err(AnalysisError::extraction(
                "summary",
                format!("{} is not finite", name),
            ));
        }
        Ok(vector)
    }

    /// Per-descriptor summaries of a waveform, before flattening
    pub fn summarize(&self, waveform: &Waveform) -> Result<FeatureSummary, AnalysisError> {
        if waveform.is_empty() {
            return Err(AnalysisError::EmptySignal);
        }

        let sample_rate = waveform.sample_rate();
        let max_samples =
            (self.config.max_duration_secs.max(0.0) as f64 * sample_rate as f64) as usize;
        let signal = &waveform.samples()[..waveform.len().min(max_samples)];
        if signal.is_empty() {
            return Err(AnalysisError::EmptySignal);
        }

        let other_bank;
        let bank = if sample_rate == self.bank.sample_rate {
            &self.bank
        } else {
            tracing::warn!(
                "[FeatureExtractor] Waveform is {} Hz, expected {} Hz; building filterbanks for {} Hz",
                sample_rate,
                self.bank.sample_rate,
                sample_rate
            );
            other_bank = RateBank::new(sample_rate, &self.config);
            &other_bank
        };

        let started = Instant::now();
        let stft = self.stft.stft(signal);
        let power = stft.power();
        let magnitude = stft.magnitude();

        let tuning = estimate_tuning(&power, sample_rate, self.config.n_fft);
        let chroma = ChromaFilterbank::new(sample_rate, self.config.n_fft, tuning).apply(&power);

        let rms = self.temporal.rms(signal);
        let shape = bank.spectral.compute_all(&magnitude);
        let zcr = self.temporal.zero_crossing_rate(signal);

        let parts = hpss::separate(
            &stft,
            &self.stft,
            signal.len(),
            self.config.hpss_kernel_size,
        );

        let mel_db = power_to_db(&bank.mel.apply(&power));
        let mfcc = self.dct.apply(&mel_db);
        let onset = bank.tempo.onset_strength(&mel_db);
        let tempo = bank.tempo.estimate(&onset);

        let mut mfcc_summaries = [Summary::default(); N_MFCC];
        for (band, slot) in mfcc_summaries.iter_mut().enumerate() {
            *slot = summarize_band(&mfcc, band)?;
        }

        let summary = FeatureSummary {
            chroma_stft: summarize_values("chroma_stft", chroma.values())?,
            rms: summarize_values("rms", &rms)?,
            spectral_centroid: summarize_values("spectral_centroid", &shape.centroid)?,
            spectral_bandwidth: summarize_values("spectral_bandwidth", &shape.bandwidth)?,
            rolloff: summarize_values("rolloff", &shape.rolloff)?,
            zero_crossing_rate: summarize_values("zero_crossing_rate", &zcr)?,
            harmony: summarize_values("harmony", &parts.harmonic)?,
            perceptr: summarize_values("perceptr", &parts.percussive)?,
            tempo,
            mfcc: mfcc_summaries,
        };

        tracing::debug!(
            "[FeatureExtractor] {} samples @ {} Hz, {} frames, tuning {:.2}, tempo {:.2} BPM in {:?}",
            signal.len(),
            sample_rate,
            stft.n_frames(),
            tuning,
            tempo,
            started.elapsed()
        );

        Ok(summary)
    }
}

fn summarize_values(stage: &str, values: &[f32]) -> Result<Summary, AnalysisError> {
    stats::mean_var(values)
        .map(|(mean, var)| Summary { mean, var })
        .ok_or_else(|| AnalysisError::extraction(stage, "descriptor has no frames"))
}

fn summarize_band(mfcc: &Spectrogram, band: usize) -> Result<Summary, AnalysisError> {
    if band >= mfcc.n_bins() {
        return Err(AnalysisError::extraction(
            "mfcc",
            format!("band {} missing, only {} computed", band + 1, mfcc.n_bins()),
        ));
    }
    let values: Vec<f32> = mfcc.frames().map(|frame| frame[band]).collect();
    summarize_values("mfcc", &values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 22_050;

    /// Generate pure sine wave for testing
    fn generate_sine_wave(sample_rate: u32, frequency: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    /// Generate seeded white noise for testing
    fn generate_white_noise(duration_samples: usize, seed: u64) -> Vec<f32> {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(seed);
        (0..duration_samples)
            .map(|_| rng.gen_range(-0.5..0.5))
            .collect()
    }

    /// Short clips keep the tests fast
    fn short_config(max_duration_secs: f32) -> AnalysisConfig {
        AnalysisConfig {
            max_duration_secs,
            ..AnalysisConfig::default()
        }
    }

    fn waveform(samples: Vec<f32>) -> Waveform {
        Waveform::new(samples, SAMPLE_RATE).unwrap()
    }

    #[test]
    fn test_feature_extractor_creation() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default()).unwrap();
        assert_eq!(extractor.config().sample_rate, SAMPLE_RATE);
        assert_eq!(extractor.bank.mel.n_mels(), 128);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AnalysisConfig {
            hop_length: 0,
            ..AnalysisConfig::default()
        };
        match FeatureExtractor::new(config) {
            Err(AnalysisError::Extraction { stage, reason }) => {
                assert_eq!(stage, "config");
                assert!(reason.contains("hop_length"), "{}", reason);
            }
            other => panic!("expected config rejection, got {:?}", other.err()),
        }

        let config = AnalysisConfig {
            n_fft: 0,
            ..AnalysisConfig::default()
        };
        assert!(FeatureExtractor::new(config).is_err());
    }

    #[test]
    fn test_empty_waveform_is_rejected() {
        let extractor = FeatureExtractor::new(AnalysisConfig::default()).unwrap();
        let err = extractor.extract(&waveform(Vec::new())).unwrap_err();
        assert_eq!(err, AnalysisError::EmptySignal);
    }

    #[test]
    fn test_vector_has_57_finite_values() {
        let extractor = FeatureExtractor::new(short_config(2.0)).unwrap();
        let signal = generate_white_noise(SAMPLE_RATE as usize * 2, 11);
        let vector = extractor.extract(&waveform(signal)).unwrap();

        assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
        assert!(vector.as_slice().iter().all(|v| v.is_finite()));
        for (name, var) in vector.variances() {
            assert!(var >= 0.0, "{} = {}", name, var);
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = FeatureExtractor::new(short_config(1.0)).unwrap();
        let signal = generate_white_noise(SAMPLE_RATE as usize, 3);
        let a = extractor.extract(&waveform(signal.clone())).unwrap();
        let b = extractor.extract(&waveform(signal)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_centroid_tracks_frequency() {
        let extractor = FeatureExtractor::new(short_config(1.0)).unwrap();
        let low = extractor
            .extract(&waveform(generate_sine_wave(SAMPLE_RATE, 200.0, 22_050)))
            .unwrap();
        let high = extractor
            .extract(&waveform(generate_sine_wave(SAMPLE_RATE, 5000.0, 22_050)))
            .unwrap();

        let low_centroid = low.get("spectral_centroid_mean").unwrap();
        let high_centroid = high.get("spectral_centroid_mean").unwrap();
        assert!(low_centroid < 500.0, "low centroid {}", low_centroid);
        assert!(high_centroid > 4000.0, "high centroid {}", high_centroid);
        assert!(high.get("rolloff_mean").unwrap() > low.get("rolloff_mean").unwrap());
    }

    #[test]
    fn test_noise_has_higher_zcr_than_sine() {
        let extractor = FeatureExtractor::new(short_config(1.0)).unwrap();
        let sine = extractor
            .extract(&waveform(generate_sine_wave(SAMPLE_RATE, 100.0, 22_050)))
            .unwrap();
        let noise = extractor
            .extract(&waveform(generate_white_noise(22_050, 5)))
            .unwrap();

        let sine_zcr = sine.get("zero_crossing_rate_mean").unwrap();
        let noise_zcr = noise.get("zero_crossing_rate_mean").unwrap();
        assert!(noise_zcr > 0.3, "noise ZCR {}", noise_zcr);
        assert!(sine_zcr < 0.02, "sine ZCR {}", sine_zcr);
    }

    #[test]
    fn test_truncates_to_max_duration() {
        let extractor = FeatureExtractor::new(short_config(1.0)).unwrap();
        let head = generate_white_noise(SAMPLE_RATE as usize, 21);

        let mut quiet_tail = head.clone();
        quiet_tail.extend(vec![0.0; 10_000]);
        let mut loud_tail = head.clone();
        loud_tail.extend(generate_sine_wave(SAMPLE_RATE, 3000.0, 10_000));

        let a = extractor.extract(&waveform(quiet_tail)).unwrap();
        let b = extractor.extract(&waveform(loud_tail)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_silence_extracts_without_error() {
        let extractor = FeatureExtractor::new(short_config(1.0)).unwrap();
        let vector = extractor.extract(&waveform(vec![0.0; 22_050])).unwrap();

        assert_eq!(vector.get("rms_mean"), Some(0.0));
        assert_eq!(vector.get("zero_crossing_rate_mean"), Some(0.0));
        assert_eq!(vector.get("spectral_centroid_mean"), Some(0.0));
        assert_eq!(vector.tempo(), 0.0);
    }

    #[test]
    fn test_other_sample_rates_are_supported() {
        let extractor = FeatureExtractor::new(short_config(1.0)).unwrap();
        let signal = generate_sine_wave(44_100, 440.0, 44_100);
        let vector = extractor
            .extract(&Waveform::new(signal, 44_100).unwrap())
            .unwrap();
        let centroid = vector.get("spectral_centroid_mean").unwrap();
        assert!((centroid - 440.0).abs() < 150.0, "centroid {}", centroid);
    }
}
