//! Presentation of prediction outcomes
//!
//! A `PredictionReport` is built from the pipeline result and rendered
//! either as the one-line console message or as a JSON payload. Failure
//! details go to the log and the `error` field; the console line stays
//! generic.

use std::path::Path;

use serde::Serialize;

use crate::error::{ClassifyError, ErrorCode};
use crate::inference::Prediction;

/// Console line printed when the pipeline fails
pub const FAILURE_LINE: &str = "Error during prediction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub genre: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub code: i32,
    pub message: String,
}

/// Serializable outcome of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub file: String,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<ClassScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl PredictionReport {
    /// Build a report from the pipeline result
    ///
    /// `classes` names the entries of `Prediction::probabilities`; scores
    /// are listed best first.
    pub fn from_outcome(
        path: &Path,
        outcome: &Result<Prediction, ClassifyError>,
        classes: &[String],
    ) -> Self {
        let file = path.display().to_string();
        match outcome {
            Ok(prediction) => {
                let mut scores: Vec<ClassScore> = classes
                    .iter()
                    .zip(&prediction.probabilities)
                    .map(|(genre, &score)| ClassScore {
                        genre: genre.clone(),
                        score,
                    })
                    .collect();
                scores.sort_by(|a, b| b.score.total_cmp(&a.score));

                Self {
                    file,
                    status: ReportStatus::Ok,
                    genre: Some(prediction.genre.clone()),
                    confidence: Some(prediction.confidence),
                    scores,
                    error: None,
                }
            }
            Err(err) => Self {
                file,
                status: ReportStatus::Error,
                genre: None,
                confidence: None,
                scores: Vec::new(),
                error: Some(ErrorReport {
                    code: err.code(),
                    message: err.message(),
                }),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReportStatus::Ok
    }

    /// One-line console rendering
    pub fn console_line(&self) -> String {
        match &self.genre {
            Some(genre) if self.is_ok() => format!("Predicted Genre: {}", genre),
            _ => FAILURE_LINE.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
