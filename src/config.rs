//! Configuration management
//!
//! Runtime configuration is loaded from a JSON file so analysis parameters
//! and artifact locations can be changed without recompiling. Analysis
//! defaults match the conventions the shipped classifier was trained with;
//! changing them silently degrades accuracy.

use serde::{Deserialize, Serialize};
use std::fs;

use crate::analysis::features::N_MFCC;
use std::path::{Path, PathBuf};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Feature extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Target sample rate every file is resampled to
    pub sample_rate: u32,
    /// Only the first `max_duration_secs` of a file are analysed
    pub max_duration_secs: f32,
    /// STFT size (also frame length for RMS and ZCR)
    pub n_fft: usize,
    /// Hop between analysis frames
    pub hop_length: usize,
    /// Mel bands feeding MFCC and onset strength
    pub n_mels: usize,
    /// Number of cepstral coefficients kept
    pub n_mfcc: usize,
    /// Fraction of spectral magnitude below the rolloff frequency
    pub rolloff_percent: f32,
    /// Median filter length for harmonic/percussive separation
    pub hpss_kernel_size: usize,
    /// Centre of the log-normal tempo prior
    pub start_bpm: f32,
    /// Tempi above this are never selected
    pub max_tempo_bpm: f32,
    /// Autocorrelation window for the tempogram, in seconds
    pub tempo_window_secs: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            max_duration_secs: 30.0,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            n_mfcc: 20,
            rolloff_percent: 0.85,
            hpss_kernel_size: 31,
            start_bpm: 120.0,
            max_tempo_bpm: 320.0,
            tempo_window_secs: 8.0,
        }
    }
}

impl AnalysisConfig {
    /// Maximum number of samples kept at `sample_rate`
    pub fn max_samples(&self) -> usize {
        (self.max_duration_secs.max(0.0) as f64 * self.sample_rate as f64) as usize
    }

    /// Check that the parameters describe a usable analysis
    ///
    /// # Returns
    /// * `Ok(())` - Parameters valid
    /// * `Err(String)` - The first offending parameter
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample_rate must be positive".to_string());
        }
        if !(self.max_duration_secs.is_finite() && self.max_duration_secs > 0.0) {
            return Err(format!(
                "max_duration_secs {} must be a positive number",
                self.max_duration_secs
            ));
        }
        if self.n_fft < 2 {
            return Err(format!("n_fft {} must be at least 2", self.n_fft));
        }
        if self.hop_length == 0 {
            return Err("hop_length must be positive".to_string());
        }
        if self.n_mels == 0 {
            return Err("n_mels must be positive".to_string());
        }
        if self.n_mfcc < N_MFCC || self.n_mfcc > self.n_mels {
            return Err(format!(
                "n_mfcc {} out of range [{}, n_mels = {}]",
                self.n_mfcc, N_MFCC, self.n_mels
            ));
        }
        if !(self.rolloff_percent > 0.0 && self.rolloff_percent <= 1.0) {
            return Err(format!(
                "rolloff_percent {} out of range (0, 1]",
                self.rolloff_percent
            ));
        }
        if self.hpss_kernel_size == 0 {
            return Err("hpss_kernel_size must be positive".to_string());
        }
        for (name, value) in [
            ("start_bpm", self.start_bpm),
            ("max_tempo_bpm", self.max_tempo_bpm),
            ("tempo_window_secs", self.tempo_window_secs),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(format!("{} {} must be a positive number", name, value));
            }
        }
        Ok(())
    }
}

/// Locations of the pretrained inference artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub scaler_path: PathBuf,
    pub label_encoder_path: PathBuf,
    pub model_path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            scaler_path: PathBuf::from("assets/scaler.json"),
            label_encoder_path: PathBuf::from("assets/label_encoder.json"),
            model_path: PathBuf::from("assets/model.json"),
        }
    }
}

impl ArtifactConfig {
    /// Resolve all artifact paths against `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            scaler_path: dir.join("scaler.json"),
            label_encoder_path: dir.join("label_encoder.json"),
            model_path: dir.join("model.json"),
        }
    }
}

/// Preview playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Length of the preview played after a prediction request
    pub preview_secs: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { preview_secs: 10.0 }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// invalid (a warning is logged in that case).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    Self::with_valid_analysis(config, path.as_ref())
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Replace unusable analysis parameters with the defaults
    fn with_valid_analysis(mut config: Self, path: &Path) -> Self {
        if let Err(reason) = config.analysis.validate() {
            log::warn!(
                "[Config] Invalid analysis settings in {:?}: {}. Using default analysis settings.",
                path,
                reason
            );
            config.analysis = AnalysisConfig::default();
        }
        config
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file("assets/genre_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.sample_rate, 22_050);
        assert_eq!(config.analysis.n_fft, 2048);
        assert_eq!(config.analysis.hop_length, 512);
        assert_eq!(config.analysis.n_mfcc, 20);
        assert_eq!(config.playback.preview_secs, 10.0);
        assert_eq!(config.analysis.max_samples(), 661_500);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.analysis, config.analysis);
        assert_eq!(parsed.artifacts, config.artifacts);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "analysis": { "max_duration_secs": 5.0 } }"#).unwrap();
        assert_eq!(parsed.analysis.max_duration_secs, 5.0);
        assert_eq!(parsed.analysis.n_fft, 2048);
        assert_eq!(parsed.artifacts, ArtifactConfig::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("definitely/not/here.json");
        assert_eq!(config.analysis, AnalysisConfig::default());
    }

    #[test]
    fn test_default_analysis_is_valid() {
        assert_eq!(AnalysisConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: [(&str, fn(&mut AnalysisConfig)); 11] = [
            ("sample_rate", |c| c.sample_rate = 0),
            ("max_duration_secs", |c| c.max_duration_secs = 0.0),
            ("n_fft", |c| c.n_fft = 0),
            ("hop_length", |c| c.hop_length = 0),
            ("n_mels", |c| c.n_mels = 0),
            ("n_mfcc", |c| c.n_mfcc = 13),
            ("rolloff_percent", |c| c.rolloff_percent = 1.5),
            ("hpss_kernel_size", |c| c.hpss_kernel_size = 0),
            ("start_bpm", |c| c.start_bpm = -1.0),
            ("max_tempo_bpm", |c| c.max_tempo_bpm = f32::NAN),
            ("tempo_window_secs", |c| c.tempo_window_secs = 0.0),
        ];
        for (name, corrupt) in cases {
            let mut config = AnalysisConfig::default();
            corrupt(&mut config);
            let err = config.validate().unwrap_err();
            assert!(err.contains(name), "{}: {}", name, err);
        }
    }

    #[test]
    fn test_invalid_analysis_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "analysis": { "hop_length": 0 }, "playback": { "preview_secs": 2.0 } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path);
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.playback.preview_secs, 2.0);
    }

    #[test]
    fn test_artifacts_in_dir() {
        let artifacts = ArtifactConfig::in_dir("/models");
        assert_eq!(artifacts.model_path, PathBuf::from("/models/model.json"));
        assert_eq!(
            artifacts.label_encoder_path,
            PathBuf::from("/models/label_encoder.json")
        );
    }
}
