// Model - classifier seam and the JSON-backed dense network
//
// The network is a stack of fully connected layers exported from the
// training environment. Weights are stored row-per-output: `weights[o][i]`
// connects input `i` to output `o`.

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Anything that maps a scaled feature row to per-class scores
pub trait GenreModel: Send + Sync {
    /// Expected input width
    fn input_width(&self) -> usize;

    /// Number of class scores produced
    fn output_width(&self) -> usize;

    /// Class scores (probabilities for a softmax head)
    fn forward(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError>;

    /// Per-layer shapes for diagnostics
    fn layers(&self) -> Vec<LayerSummary> {
        Vec::new()
    }
}

/// Shape and activation of one layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub inputs: usize,
    pub outputs: usize,
    pub activation: Activation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Linear,
    Softmax,
}

impl Activation {
    fn apply(self, values: &mut [f32]) {
        match self {
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Sigmoid => values
                .iter_mut()
                .for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Linear => {}
            Activation::Softmax => softmax(values),
        }
    }
}

fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

/// Fully connected layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    pub activation: Activation,
}

impl DenseLayer {
    pub fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    pub fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn validate(&self, index: usize) -> Result<(), InferenceError> {
        if self.weights.is_empty() || self.inputs() == 0 {
            return Err(InferenceError::ArtifactLoad {
                artifact: "model".to_string(),
                reason: format!("layer {} has no weights", index),
            });
        }
        if let Some(row) = self.weights.iter().find(|row| row.len() != self.inputs()) {
            return Err(InferenceError::ShapeMismatch {
                context: format!("layer {} weight row", index),
                expected: self.inputs(),
                actual: row.len(),
            });
        }
        if self.bias.len() != self.outputs() {
            return Err(InferenceError::ShapeMismatch {
                context: format!("layer {} bias", index),
                expected: self.outputs(),
                actual: self.bias.len(),
            });
        }
        Ok(())
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        let mut out: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, &b)| row.iter().zip(input).map(|(&w, &x)| w * x).sum::<f32>() + b)
            .collect();
        self.activation.apply(&mut out);
        out
    }
}

/// Feed-forward network loaded from `model.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Build a network, checking that consecutive layers fit together
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, InferenceError> {
        let network = Self { layers };
        network.validate()?;
        Ok(network)
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.layers.is_empty() {
            return Err(InferenceError::ArtifactLoad {
                artifact: "model".to_string(),
                reason: "network has no layers".to_string(),
            });
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer.validate(i)?;
        }
        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[1].inputs() != pair[0].outputs() {
                return Err(InferenceError::ShapeMismatch {
                    context: format!("layer {} input", i + 1),
                    expected: pair[0].outputs(),
                    actual: pair[1].inputs(),
                });
            }
        }
        Ok(())
    }
}

impl GenreModel for DenseNetwork {
    fn input_width(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::inputs)
    }

    fn output_width(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::outputs)
    }

    fn forward(&self, input: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if input.len() != self.input_width() {
            return Err(InferenceError::ShapeMismatch {
                context: "model input".to_string(),
                expected: self.input_width(),
                actual: input.len(),
            });
        }

        let mut activations = input.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }
        Ok(activations)
    }

    fn layers(&self) -> Vec<LayerSummary> {
        self.layers
            .iter()
            .map(|layer| LayerSummary {
                inputs: layer.inputs(),
                outputs: layer.outputs(),
                activation: layer.activation,
            })
            .collect()
    }
}
