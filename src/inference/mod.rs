// Inference module - scaler, label encoder and classifier
//
// The three artifacts are loaded once into an immutable InferenceContext
// that every prediction borrows. Nothing here is global: callers decide how
// long the context lives and share it by reference.

mod labels;
mod model;
mod scaler;

pub use labels::LabelEncoder;
pub use model::{Activation, DenseLayer, DenseNetwork, GenreModel, LayerSummary};
pub use scaler::StandardScaler;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::analysis::extract_file;
use crate::analysis::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::config::{AnalysisConfig, ArtifactConfig};
use crate::error::{ClassifyError, InferenceError};

/// Outcome of classifying one feature vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub genre: String,
    pub class_index: usize,
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

/// Summary of the loaded artifacts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSummary {
    pub n_features: usize,
    pub classes: Vec<String>,
    pub layers: Vec<LayerSummary>,
}

/// Read-only bundle of scaler, label encoder and classifier
pub struct InferenceContext {
    scaler: StandardScaler,
    labels: LabelEncoder,
    model: Box<dyn GenreModel>,
}

impl InferenceContext {
    /// Load all three artifacts from the configured paths
    ///
    /// # Errors
    /// * `ArtifactLoad` - a file is missing or is not valid JSON for its role
    /// * `ShapeMismatch` - scaler, network and label set disagree in width
    pub fn load(artifacts: &ArtifactConfig) -> Result<Self, InferenceError> {
        let scaler: StandardScaler = read_artifact("scaler", &artifacts.scaler_path)?;
        let labels: LabelEncoder = read_artifact("label_encoder", &artifacts.label_encoder_path)?;
        let network: DenseNetwork = read_artifact("model", &artifacts.model_path)?;
        network.validate()?;

        let context = Self::new(scaler, labels, Box::new(network))?;
        log::info!(
            "[InferenceContext] Loaded artifacts: {} features, {} classes",
            context.scaler.width(),
            context.labels.len()
        );
        Ok(context)
    }

    /// Assemble a context from already-loaded parts
    pub fn new(
        scaler: StandardScaler,
        labels: LabelEncoder,
        model: Box<dyn GenreModel>,
    ) -> Result<Self, InferenceError> {
        scaler.validate(&FEATURE_NAMES)?;

        if labels.is_empty() {
            return Err(InferenceError::ArtifactLoad {
                artifact: "label_encoder".to_string(),
                reason: "no classes".to_string(),
            });
        }
        if model.input_width() != FEATURE_COUNT {
            return Err(InferenceError::ShapeMismatch {
                context: "model input width".to_string(),
                expected: FEATURE_COUNT,
                actual: model.input_width(),
            });
        }
        if model.output_width() != labels.len() {
            return Err(InferenceError::ShapeMismatch {
                context: "model output width".to_string(),
                expected: labels.len(),
                actual: model.output_width(),
            });
        }

        Ok(Self {
            scaler,
            labels,
            model,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.labels.classes
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            n_features: self.scaler.width(),
            classes: self.labels.classes.clone(),
            layers: self.model.layers(),
        }
    }

    /// Scale, run the classifier, take the best class and decode its label
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, InferenceError> {
        let scaled = self.scaler.transform(features.as_slice())?;
        let probabilities = self.model.forward(&scaled)?;

        // Ties resolve to the lowest class index
        let (class_index, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .reduce(|best, next| if next.1 > best.1 { next } else { best })
            .ok_or(InferenceError::ShapeMismatch {
                context: "model output".to_string(),
                expected: self.labels.len(),
                actual: 0,
            })?;
        let genre = self.labels.inverse_transform(class_index)?.to_string();

        log::debug!(
            "[InferenceContext] Predicted {} (class {}, score {:.3})",
            genre,
            class_index,
            confidence
        );

        Ok(Prediction {
            genre,
            class_index,
            confidence,
            probabilities,
        })
    }
}

/// Decode, extract and classify one file
///
/// This is the single pipeline every presentation mode goes through.
pub fn classify_file(
    context: &InferenceContext,
    path: &Path,
    config: &AnalysisConfig,
) -> Result<Prediction, ClassifyError> {
    let features = extract_file(path, config)?;
    Ok(context.predict(&features)?)
}

fn read_artifact<T: DeserializeOwned>(artifact: &str, path: &Path) -> Result<T, InferenceError> {
    let contents = fs::read_to_string(path).map_err(|err| InferenceError::ArtifactLoad {
        artifact: artifact.to_string(),
        reason: format!("{}: {}", path.display(), err),
    })?;
    serde_json::from_str(&contents).map_err(|err| InferenceError::ArtifactLoad {
        artifact: artifact.to_string(),
        reason: format!("{}: {}", path.display(), err),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CLASSES: [&str; 3] = ["blues", "classical", "metal"];

    /// Network whose class scores are driven by the scaled tempo column
    fn tempo_network() -> DenseNetwork {
        let mut weights = vec![vec![0.0f32; FEATURE_COUNT]; CLASSES.len()];
        weights[0][16] = -1.0;
        weights[2][16] = 1.0;
        DenseNetwork::new(vec![DenseLayer {
            weights,
            bias: vec![0.0, 0.5, 0.0],
            activation: Activation::Softmax,
        }])
        .unwrap()
    }

    fn scaler() -> StandardScaler {
        let mut mean = vec![0.0; FEATURE_COUNT];
        mean[16] = 120.0;
        let mut scale = vec![1.0; FEATURE_COUNT];
        scale[16] = 10.0;
        StandardScaler::new(mean, scale)
    }

    fn context() -> InferenceContext {
        InferenceContext::new(
            scaler(),
            LabelEncoder::new(CLASSES),
            Box::new(tempo_network()),
        )
        .unwrap()
    }

    fn with_tempo(tempo: f32) -> FeatureVector {
        let mut values = [0.0f32; FEATURE_COUNT];
        values[16] = tempo;
        FeatureVector::from_values(values)
    }

    #[test]
    fn test_tied_scores_pick_first_class() {
        let network = DenseNetwork::new(vec![DenseLayer {
            weights: vec![vec![0.0f32; FEATURE_COUNT]; CLASSES.len()],
            bias: vec![0.0; CLASSES.len()],
            activation: Activation::Softmax,
        }])
        .unwrap();
        let ctx = InferenceContext::new(
            StandardScaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]),
            LabelEncoder::new(CLASSES),
            Box::new(network),
        )
        .unwrap();

        let prediction = ctx
            .predict(&FeatureVector::from_values([0.0; FEATURE_COUNT]))
            .unwrap();
        assert_eq!(prediction.class_index, 0);
        assert_eq!(prediction.genre, "blues");
    }

    #[test]
    fn test_predict_picks_best_class() {
        let ctx = context();
        assert_eq!(ctx.predict(&with_tempo(180.0)).unwrap().genre, "metal");
        assert_eq!(ctx.predict(&with_tempo(60.0)).unwrap().genre, "blues");

        let neutral = ctx.predict(&with_tempo(120.0)).unwrap();
        assert_eq!(neutral.genre, "classical");
        assert_eq!(neutral.class_index, 1);
        assert_eq!(neutral.probabilities.len(), 3);
        assert!((neutral.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(neutral.confidence, neutral.probabilities[1]);
    }

    #[test]
    fn test_rejects_output_width_mismatch() {
        let err = InferenceContext::new(
            scaler(),
            LabelEncoder::new(["a", "b"]),
            Box::new(tempo_network()),
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            InferenceError::ShapeMismatch {
                context: "model output width".to_string(),
                expected: 2,
                actual: 3,
            }
        );
    }

    #[test]
    fn test_rejects_short_scaler() {
        let err = InferenceContext::new(
            StandardScaler::new(vec![0.0; 10], vec![1.0; 10]),
            LabelEncoder::new(CLASSES),
            Box::new(tempo_network()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, InferenceError::ShapeMismatch { expected: 57, actual: 10, .. }));
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactConfig::in_dir(dir.path());
        fs::write(&artifacts.scaler_path, serde_json::to_string(&scaler()).unwrap()).unwrap();
        fs::write(
            &artifacts.label_encoder_path,
            serde_json::to_string(&LabelEncoder::new(CLASSES)).unwrap(),
        )
        .unwrap();
        fs::write(
            &artifacts.model_path,
            serde_json::to_string(&tempo_network()).unwrap(),
        )
        .unwrap();

        let ctx = InferenceContext::load(&artifacts).unwrap();
        assert_eq!(ctx.classes().len(), 3);
        let summary = ctx.summary();
        assert_eq!(summary.n_features, FEATURE_COUNT);
        assert_eq!(summary.layers.len(), 1);
        assert_eq!(summary.layers[0].outputs, 3);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let err = InferenceContext::load(&ArtifactConfig::in_dir(dir.path()))
            .err()
            .unwrap();
        match err {
            InferenceError::ArtifactLoad { artifact, .. } => assert_eq!(artifact, "scaler"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_artifact() {
        let dir = TempDir::new().unwrap();
        let artifacts = ArtifactConfig::in_dir(dir.path());
        fs::write(&artifacts.scaler_path, serde_json::to_string(&scaler()).unwrap()).unwrap();
        fs::write(&artifacts.label_encoder_path, "{ \"classes\": 3 }").unwrap();

        let err = InferenceContext::load(&artifacts).err().unwrap();
        assert!(matches!(
            err,
            InferenceError::ArtifactLoad { ref artifact, .. } if artifact == "label_encoder"
        ));
    }

    #[test]
    fn test_classify_missing_file_is_analysis_error() {
        let dir = TempDir::new().unwrap();
        let err = classify_file(
            &context(),
            &dir.path().join("nope.wav"),
            &AnalysisConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClassifyError::Analysis(_)));
    }
}
