//! Model Module - Ensemble Scoring
//!
//! Scaler and classifier collaborators behind traits, the ONNX Runtime
//! implementations, and the policy that turns three probabilities into one
//! decision.

pub mod classifier;
pub mod scaler;
pub mod onnx;
pub mod policy;
pub mod scorer;

#[cfg(test)]
pub(crate) mod tests;

// Re-export common types
pub use classifier::{Classifier, ModelKind, ModelLoadError, ScoringError};
pub use scaler::{Scaler, ScalerParams, StandardScaler};
pub use onnx::OnnxClassifier;
pub use policy::{Confidence, EnsembleWeights, ScoringPolicy, Status, round_score};
pub use scorer::{EnsembleScorer, ScoreResult};
