//! Scoring Policy
//!
//! Ensemble weights, anomaly threshold and the confidence step function.
//! The threshold and the confidence breakpoints are independent constants:
//! a flow can be an anomaly with LOW confidence.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::constants::{
    CONFIDENCE_HIGH, CONFIDENCE_MEDIUM, DEFAULT_ANOMALY_THRESHOLD,
    DEFAULT_WEIGHT_RESIDUAL, DEFAULT_WEIGHT_SEQUENCE, DEFAULT_WEIGHT_TABULAR,
    SCORE_DECIMALS,
};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// ============================================================================
// CONFIDENCE / STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Step function over the ensemble score: HIGH ≥ 0.85, MEDIUM ≥ 0.65
    pub fn from_score(score: f64) -> Self {
        if score >= CONFIDENCE_HIGH {
            Confidence::High
        } else if score >= CONFIDENCE_MEDIUM {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Anomaly,
    Normal,
}

impl Status {
    pub fn from_anomaly(is_anomaly: bool) -> Self {
        if is_anomaly { Status::Anomaly } else { Status::Normal }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Anomaly => "ANOMALY",
            Status::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// Per-member ensemble weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub tabular: f64,
    pub sequence: f64,
    pub residual: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            tabular: DEFAULT_WEIGHT_TABULAR,
            sequence: DEFAULT_WEIGHT_SEQUENCE,
            residual: DEFAULT_WEIGHT_RESIDUAL,
        }
    }
}

impl EnsembleWeights {
    pub fn sum(&self) -> f64 {
        self.tabular + self.sequence + self.residual
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    pub weights: EnsembleWeights,
    pub anomaly_threshold: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: EnsembleWeights::default(),
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
        }
    }
}

impl ScoringPolicy {
    /// Validated policy. Rejected policies are a startup error.
    pub fn new(weights: EnsembleWeights, anomaly_threshold: f64) -> Result<Self, ConfigError> {
        let policy = Self { weights, anomaly_threshold };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        for (name, value) in [("tabular", w.tabular), ("sequence", w.sequence), ("residual", w.residual)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPolicy(format!("{} weight must be non-negative, got {}", name, value)));
            }
        }

        let sum = w.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidPolicy(format!("weights must sum to 1.0, got {}", sum)));
        }

        if !(0.0..=1.0).contains(&self.anomaly_threshold) {
            return Err(ConfigError::InvalidPolicy(format!(
                "anomaly threshold must be in [0, 1], got {}",
                self.anomaly_threshold
            )));
        }

        Ok(())
    }

    /// Weighted sum of member probabilities, full precision
    pub fn combine(&self, tabular: f64, sequence: f64, residual: f64) -> f64 {
        let w = &self.weights;
        let score = w.tabular * tabular + w.sequence * sequence + w.residual * residual;
        score.clamp(0.0, 1.0)
    }

    pub fn is_anomaly(&self, ensemble_score: f64) -> bool {
        ensemble_score >= self.anomaly_threshold
    }
}

/// Presentation rounding (4 decimals). Decisions never use the rounded value.
pub fn round_score(value: f64) -> f64 {
    let factor = 10f64.powi(SCORE_DECIMALS);
    (value * factor).round() / factor
}
