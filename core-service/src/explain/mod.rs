//! Explain Module - Free-text anomaly explanations
//!
//! The explainer is an opaque, fallible collaborator. Failures never drop an
//! event: callers substitute a placeholder.

pub mod types;
pub mod llm;

use crate::config::ExplainerConfig;
use crate::constants::EXPLANATION_PLACEHOLDER;
use crate::model::ScoreResult;

pub use types::{ExplainError, KeyIndicators, ThreatAssessment, ThreatLevel};
pub use llm::LlmExplainer;

/// Produces explanatory text for an anomalous score
pub trait Explainer: Send + Sync {
    fn explain(&self, score: &ScoreResult, indicators: &KeyIndicators) -> Result<String, ExplainError>;
}

/// Used when no explainer is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledExplainer;

impl Explainer for DisabledExplainer {
    fn explain(&self, _score: &ScoreResult, _indicators: &KeyIndicators) -> Result<String, ExplainError> {
        Err(ExplainError::Disabled)
    }
}

/// LLM explainer when a key is configured, otherwise the disabled one
pub fn from_config(config: &ExplainerConfig) -> Box<dyn Explainer> {
    match LlmExplainer::new(config) {
        Ok(explainer) => {
            log::info!("Explainer enabled ({} via {})", config.model, config.url);
            Box::new(explainer)
        }
        Err(e) => {
            log::warn!("{}; anomalies get a placeholder explanation", e);
            Box::new(DisabledExplainer)
        }
    }
}

/// Explanation text, or the placeholder when the explainer fails
pub fn explain_or_placeholder(explainer: &dyn Explainer, score: &ScoreResult, indicators: &KeyIndicators) -> String {
    match explainer.explain(score, indicators) {
        Ok(text) => text,
        Err(ExplainError::Disabled) => EXPLANATION_PLACEHOLDER.to_string(),
        Err(e) => {
            log::warn!("Explainer failed: {}", e);
            format!("{}: {}", EXPLANATION_PLACEHOLDER, e)
        }
    }
}
