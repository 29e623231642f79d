// Label encoder - class index to genre name

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Genre names indexed by classifier output position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Genre name of a class index
    pub fn inverse_transform(&self, index: usize) -> Result<&str, InferenceError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(InferenceError::UnknownClass { index })
    }
}
