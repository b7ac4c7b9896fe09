//! Classifier Collaborator Contract
//!
//! The three ensemble members are opaque: each takes the scaled feature
//! vector and returns a probability. Implementations must be synchronous and
//! deterministic for identical input.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::features::FEATURE_COUNT;
use crate::features::layout::LayoutMismatchError;

// ============================================================================
// ERRORS
// ============================================================================

/// Scoring failed for one flow. The caller drops the record.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScoringError {
    #[error("{model} classifier failed: {message}")]
    Classifier { model: ModelKind, message: String },

    #[error("{model} classifier returned invalid probability {value}")]
    InvalidProbability { model: ModelKind, value: f64 },

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),
}

/// Scaler or classifier artifact could not be loaded. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("model artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact {}: {reason}", .path.display())]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("onnx runtime error for {}: {message}", .path.display())]
    Runtime { path: PathBuf, message: String },
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Ensemble member identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Gradient boosted trees over the flat vector
    Tabular,
    /// 3D CNN over the (3,3,4,1) reshaped vector
    Sequence,
    /// Residual network over the flat vector
    Residual,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Tabular, ModelKind::Sequence, ModelKind::Residual];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Tabular => "tabular",
            ModelKind::Sequence => "sequence",
            ModelKind::Residual => "residual",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probability source for one ensemble member
pub trait Classifier: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Probability of the anomalous class for an already scaled vector
    fn predict_proba(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<f64, ScoringError>;
}

/// Reject probabilities outside [0, 1] instead of substituting a default
pub fn check_probability(model: ModelKind, value: f64) -> Result<f64, ScoringError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ScoringError::InvalidProbability { model, value })
    }
}
