//! Ensemble Scorer
//!
//! FeatureVector → scaler → three classifiers → weighted ensemble score,
//! confidence band and anomaly decision. A pure function of the vector and
//! the policy; any member failure fails the whole score.

use serde::{Deserialize, Serialize};

use crate::config::ModelArtifacts;
use crate::features::FeatureVector;
use super::classifier::{check_probability, Classifier, ModelKind, ModelLoadError, ScoringError};
use super::onnx::OnnxClassifier;
use super::policy::{round_score, Confidence, ScoringPolicy, Status};
use super::scaler::{Scaler, StandardScaler};

/// Scoring outcome for one flow. Scores are rounded for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub status: Status,
    pub ensemble_score: f64,
    pub tabular_score: f64,
    pub sequence_score: f64,
    pub residual_score: f64,
    pub is_anomaly: bool,
    pub confidence: Confidence,
}

pub struct EnsembleScorer {
    scaler: Box<dyn Scaler>,
    tabular: Box<dyn Classifier>,
    sequence: Box<dyn Classifier>,
    residual: Box<dyn Classifier>,
    policy: ScoringPolicy,
}

impl EnsembleScorer {
    pub fn new(
        scaler: Box<dyn Scaler>,
        tabular: Box<dyn Classifier>,
        sequence: Box<dyn Classifier>,
        residual: Box<dyn Classifier>,
        policy: ScoringPolicy,
    ) -> Self {
        Self { scaler, tabular, sequence, residual, policy }
    }

    /// Load the scaler and the three ONNX members from disk
    pub fn load(artifacts: &ModelArtifacts, policy: ScoringPolicy) -> Result<Self, ModelLoadError> {
        let scaler = StandardScaler::load(&artifacts.scaler)?;
        let tabular = OnnxClassifier::load(ModelKind::Tabular, &artifacts.tabular)?;
        let sequence = OnnxClassifier::load(ModelKind::Sequence, &artifacts.sequence)?;
        let residual = OnnxClassifier::load(ModelKind::Residual, &artifacts.residual)?;

        log::info!(
            "Ensemble ready (weights {:.2}/{:.2}/{:.2}, threshold {})",
            policy.weights.tabular, policy.weights.sequence, policy.weights.residual,
            policy.anomaly_threshold
        );

        Ok(Self::new(
            Box::new(scaler),
            Box::new(tabular),
            Box::new(sequence),
            Box::new(residual),
            policy,
        ))
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn score(&self, features: &FeatureVector) -> Result<ScoreResult, ScoringError> {
        features.validate()?;

        let scaled = self.scaler.transform(features.as_array());

        let tabular = member_score(self.tabular.as_ref(), ModelKind::Tabular, &scaled)?;
        let sequence = member_score(self.sequence.as_ref(), ModelKind::Sequence, &scaled)?;
        let residual = member_score(self.residual.as_ref(), ModelKind::Residual, &scaled)?;

        let ensemble = self.policy.combine(tabular, sequence, residual);
        let is_anomaly = self.policy.is_anomaly(ensemble);

        Ok(ScoreResult {
            status: Status::from_anomaly(is_anomaly),
            ensemble_score: round_score(ensemble),
            tabular_score: round_score(tabular),
            sequence_score: round_score(sequence),
            residual_score: round_score(residual),
            is_anomaly,
            confidence: Confidence::from_score(ensemble),
        })
    }
}

fn member_score(
    classifier: &dyn Classifier,
    slot: ModelKind,
    scaled: &[f64; crate::features::FEATURE_COUNT],
) -> Result<f64, ScoringError> {
    let probability = classifier.predict_proba(scaled)?;
    check_probability(slot, probability)
}
