// Types module - Data structures for audio features
//
// The feature vector is the only artifact handed from extraction to the
// classifier. Its layout is fixed: downstream scalers and models index it
// by position, so the order of FEATURE_NAMES must never change.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Number of MFCC bands reduced into the vector
pub const N_MFCC: usize = 20;

/// Total number of values in a feature vector
pub const FEATURE_COUNT: usize = 57;

/// Index of the tempo scalar
pub const TEMPO_INDEX: usize = 16;

/// Column names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "chroma_stft_mean",
    "chroma_stft_var",
    "rms_mean",
    "rms_var",
    "spectral_centroid_mean",
    "spectral_centroid_var",
    "spectral_bandwidth_mean",
    "spectral_bandwidth_var",
    "rolloff_mean",
    "rolloff_var",
    "zero_crossing_rate_mean",
    "zero_crossing_rate_var",
    "harmony_mean",
    "harmony_var",
    "perceptr_mean",
    "perceptr_var",
    "tempo",
    "mfcc1_mean",
    "mfcc1_var",
    "mfcc2_mean",
    "mfcc2_var",
    "mfcc3_mean",
    "mfcc3_var",
    "mfcc4_mean",
    "mfcc4_var",
    "mfcc5_mean",
    "mfcc5_var",
    "mfcc6_mean",
    "mfcc6_var",
    "mfcc7_mean",
    "mfcc7_var",
    "mfcc8_mean",
    "mfcc8_var",
    "mfcc9_mean",
    "mfcc9_var",
    "mfcc10_mean",
    "mfcc10_var",
    "mfcc11_mean",
    "mfcc11_var",
    "mfcc12_mean",
    "mfcc12_var",
    "mfcc13_mean",
    "mfcc13_var",
    "mfcc14_mean",
    "mfcc14_var",
    "mfcc15_mean",
    "mfcc15_var",
    "mfcc16_mean",
    "mfcc16_var",
    "mfcc17_mean",
    "mfcc17_var",
    "mfcc18_mean",
    "mfcc18_var",
    "mfcc19_mean",
    "mfcc19_var",
    "mfcc20_mean",
    "mfcc20_var",
];

/// Mean and population variance of one descriptor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    pub mean: f32,
    pub var: f32,
}

/// Per-clip summary of every descriptor, before flattening
///
/// Fields are listed in vector order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    /// Chroma energy over all frames and all 12 pitch classes
    pub chroma_stft: Summary,
    /// Frame-wise root-mean-square energy
    pub rms: Summary,
    /// Spectral centroid in Hz
    pub spectral_centroid: Summary,
    /// Spectral bandwidth in Hz
    pub spectral_bandwidth: Summary,
    /// Spectral rolloff in Hz (85% of magnitude)
    pub rolloff: Summary,
    /// Zero-crossing rate (0.0 to 1.0)
    pub zero_crossing_rate: Summary,
    /// Time-domain harmonic component
    pub harmony: Summary,
    /// Time-domain percussive component
    pub perceptr: Summary,
    /// Global tempo estimate in BPM
    pub tempo: f32,
    /// MFCC bands 1..=20
    pub mfcc: [Summary; N_MFCC],
}

impl FeatureSummary {
    /// Flatten into the fixed 57-value layout
    pub fn into_vector(self) -> FeatureVector {
        let mut values = [0.0f32; FEATURE_COUNT];
        let head = [
            self.chroma_stft,
            self.rms,
            self.spectral_centroid,
            self.spectral_bandwidth,
            self.rolloff,
            self.zero_crossing_rate,
            self.harmony,
            self.perceptr,
        ];

        for (i, summary) in head.iter().enumerate() {
            values[2 * i] = summary.mean;
            values[2 * i + 1] = summary.var;
        }
        values[TEMPO_INDEX] = self.tempo;
        for (band, summary) in self.mfcc.iter().enumerate() {
            values[TEMPO_INDEX + 1 + 2 * band] = summary.mean;
            values[TEMPO_INDEX + 2 + 2 * band] = summary.var;
        }

        FeatureVector { values }
    }
}

/// Fixed-length vector of 57 audio statistics
///
/// Serializes as a JSON object keyed by column name, in vector order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }

    pub fn tempo(&self) -> f32 {
        self.values[TEMPO_INDEX]
    }

    /// (name, value) pairs in vector order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Values of every variance column
    pub fn variances(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.named().filter(|(name, _)| name.ends_with("_var"))
    }

    /// First column holding a NaN or infinity, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.named()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name)
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.named() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_summary() -> FeatureSummary {
        let s = |k: usize| Summary {
            mean: (2 * k) as f32,
            var: (2 * k + 1) as f32,
        };
        let mut mfcc = [Summary::default(); N_MFCC];
        for (band, slot) in mfcc.iter_mut().enumerate() {
            *slot = Summary {
                mean: (17 + 2 * band) as f32,
                var: (18 + 2 * band) as f32,
            };
        }
        FeatureSummary {
            chroma_stft: s(0),
            rms: s(1),
            spectral_centroid: s(2),
            spectral_bandwidth: s(3),
            rolloff: s(4),
            zero_crossing_rate: s(5),
            harmony: s(6),
            perceptr: s(7),
            tempo: 16.0,
            mfcc,
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_flatten_order() {
        let vector = numbered_summary().into_vector();
        for (i, &value) in vector.as_slice().iter().enumerate() {
            assert_eq!(value, i as f32, "column {} ({})", i, FEATURE_NAMES[i]);
        }
        assert_eq!(vector.tempo(), 16.0);
        assert_eq!(vector.get("mfcc20_var"), Some(56.0));
        assert_eq!(vector.get("perceptr_mean"), Some(14.0));
        assert_eq!(vector.get("missing"), None);
    }

    #[test]
    fn test_variance_columns() {
        let vector = numbered_summary().into_vector();
        let variances: Vec<_> = vector.variances().collect();
        assert_eq!(variances.len(), 28);
        assert!(variances.iter().all(|(name, _)| name.ends_with("_var")));
    }

    #[test]
    fn test_serializes_named_columns_in_order() {
        let vector = numbered_summary().into_vector();
        let json = serde_json::to_string(&vector).unwrap();
        assert!(json.starts_with("{\"chroma_stft_mean\":0.0,\"chroma_stft_var\":1.0"));
        assert!(json.contains("\"tempo\":16.0"));
        let first = json.find("rms_mean").unwrap();
        let last = json.find("mfcc1_mean").unwrap();
        assert!(first < last);
    }

    #[test]
    fn test_first_non_finite() {
        let mut values = [0.0f32; FEATURE_COUNT];
        assert_eq!(FeatureVector::from_values(values).first_non_finite(), None);
        values[5] = f32::NAN;
        assert_eq!(
            FeatureVector::from_values(values).first_non_finite(),
            Some("spectral_centroid_var")
        );
    }
}
