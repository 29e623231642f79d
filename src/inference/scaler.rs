// Scaler - per-feature standardization fitted at training time

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Standardizes features as `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
    /// Column names the scaler was fitted on, when exported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Self {
        Self {
            mean,
            scale,
            feature_names: None,
        }
    }

    /// Number of features the scaler expects
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Check that mean and scale agree with each other and with `names`
    pub fn validate(&self, names: &[&str]) -> Result<(), InferenceError> {
        if self.scale.len() != self.mean.len() {
            return Err(InferenceError::ShapeMismatch {
                context: "scaler scale".to_string(),
                expected: self.mean.len(),
                actual: self.scale.len(),
            });
        }
        if self.width() != names.len() {
            return Err(InferenceError::ShapeMismatch {
                context: "scaler width".to_string(),
                expected: names.len(),
                actual: self.width(),
            });
        }

        if let Some(fitted) = &self.feature_names {
            if fitted.len() != names.len() {
                return Err(InferenceError::ShapeMismatch {
                    context: "scaler feature_names".to_string(),
                    expected: names.len(),
                    actual: fitted.len(),
                });
            }
            if let Some((i, (got, want))) = fitted
                .iter()
                .zip(names.iter())
                .enumerate()
                .find(|(_, (got, want))| got.as_str() != **want)
            {
                return Err(InferenceError::ArtifactLoad {
                    artifact: "scaler".to_string(),
                    reason: format!("column {} is '{}', expected '{}'", i, got, want),
                });
            }
        }
        Ok(())
    }

    /// Standardize one feature row
    ///
    /// A zero scale (constant training column) leaves the centered value
    /// unscaled.
    pub fn transform(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if features.len() != self.width() {
            return Err(InferenceError::ShapeMismatch {
                context: "scaler input".to_string(),
                expected: self.width(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&mean, &scale))| {
                let scale = if scale == 0.0 { 1.0 } else { scale };
                (x - mean) / scale
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_standardizes() {
        let scaler = StandardScaler::new(vec![1.0, 10.0, 5.0], vec![2.0, 5.0, 0.0]);
        let scaled = scaler.transform(&[3.0, 0.0, 7.0]).unwrap();
        assert_eq!(scaled, vec![1.0, -2.0, 2.0]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]);
        let err = scaler.transform(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::ShapeMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_checks_names() {
        let mut scaler = StandardScaler::new(vec![0.0; 2], vec![1.0; 2]);
        assert!(scaler.validate(&["a", "b"]).is_ok());
        assert!(scaler.validate(&["a", "b", "c"]).is_err());

        scaler.feature_names = Some(vec!["a".to_string(), "x".to_string()]);
        let err = scaler.validate(&["a", "b"]).unwrap_err();
        assert!(matches!(err, InferenceError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_deserialize_without_names() {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{ "mean": [0.5], "scale": [2.0] }"#).unwrap();
        assert_eq!(scaler.feature_names, None);
        assert_eq!(scaler.transform(&[2.5]).unwrap(), vec![1.0]);
    }
}
