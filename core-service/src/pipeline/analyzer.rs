use std::sync::Arc;

use crate::explain::{self, Explainer, KeyIndicators};
use crate::features::{FeatureNormalizer, FeatureVector, FlowRecord, FlowSummary, NormalizeError};
use crate::model::{EnsembleScorer, ScoreResult, ScoringError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    InvalidRecord(#[from] NormalizeError),

    #[error("scoring failure: {0}")]
    ScoringFailure(#[from] ScoringError),
}

/// Result of analyzing one record, before it becomes an event
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub flow: FlowSummary,
    pub features: FeatureVector,
    pub score: ScoreResult,
    /// Set for anomalies only
    pub explanation: Option<String>,
}

/// Normalize → score → explain, shared by the live pipeline and the
/// request API.
#[derive(Clone)]
pub struct FlowAnalyzer {
    normalizer: FeatureNormalizer,
    scorer: Arc<EnsembleScorer>,
    explainer: Arc<dyn Explainer>,
}

impl FlowAnalyzer {
    pub fn new(scorer: Arc<EnsembleScorer>, explainer: Arc<dyn Explainer>) -> Self {
        Self {
            normalizer: FeatureNormalizer::new(),
            scorer,
            explainer,
        }
    }

    pub fn scorer(&self) -> &EnsembleScorer {
        &self.scorer
    }

    pub fn analyze(&self, record: &FlowRecord) -> Result<Analysis, AnalyzeError> {
        let (flow, features) = self.normalizer.normalize(record)?;
        let score = self.scorer.score(&features)?;

        let explanation = if score.is_anomaly {
            let indicators = KeyIndicators::from_features(&features);
            Some(explain::explain_or_placeholder(self.explainer.as_ref(), &score, &indicators))
        } else {
            None
        };

        Ok(Analysis { flow, features, score, explanation })
    }
}
