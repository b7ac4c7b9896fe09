//! Explainer Types
//!
//! Error kinds, the indicators quoted to the explainer and the strict
//! parser for the assessment it returns.

use std::fmt;

use patterns::{CODE_FENCE, RESULT_ASSIGNMENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::FeatureVector;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplainError {
    #[error("explainer disabled (no API key configured)")]
    Disabled,

    #[error("explainer request failed: {0}")]
    Transport(String),

    #[error("explainer returned HTTP {status}")]
    Status { status: u16 },

    #[error("explainer returned no content")]
    EmptyResponse,

    #[error("malformed explanation: {0}")]
    Malformed(String),
}

// ============================================================================
// KEY INDICATORS
// ============================================================================

/// Feature values quoted to the explainer as evidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyIndicators {
    pub syn_flag_count: f64,
    pub flow_packets_s: f64,
    pub flow_bytes_s: f64,
    pub total_fwd_packets: f64,
    pub total_bwd_packets: f64,
    pub destination_port: f64,
}

impl KeyIndicators {
    pub fn from_features(features: &FeatureVector) -> Self {
        let get = |name: &str| features.get_by_name(name).unwrap_or(0.0);
        Self {
            syn_flag_count: get("SYN Flag Count"),
            flow_packets_s: get("Flow Packets/s"),
            flow_bytes_s: get("Flow Bytes/s"),
            total_fwd_packets: get("Total Fwd Packets"),
            total_bwd_packets: get("Total Backward Packets"),
            destination_port: get("Destination Port"),
        }
    }
}

// ============================================================================
// ASSESSMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    #[serde(alias = "low", alias = "Low")]
    Low,
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "high", alias = "High")]
    High,
    #[serde(alias = "critical", alias = "Critical")]
    Critical,
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Structured answer expected from the explainer model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub threat_level: ThreatLevel,
    #[serde(alias = "attack_type_en")]
    pub attack_type: String,
    pub mitre_technique: String,
    #[serde(alias = "summary_en")]
    pub summary: String,
    #[serde(alias = "impact_en")]
    pub impact: String,
    #[serde(alias = "recommendation_en")]
    pub recommendation: String,
    pub data_evidence: String,
}

impl ThreatAssessment {
    /// Parse model output. Accepts a JSON object or a one-element array,
    /// optionally wrapped in a code fence. Anything else is rejected.
    pub fn parse(raw: &str) -> Result<Self, ExplainError> {
        let text = raw.trim();
        let text = CODE_FENCE.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(text);
        let text = RESULT_ASSIGNMENT.replace(text, "");

        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| ExplainError::Malformed(e.to_string()))?;

        let object = match value {
            Value::Array(mut items) if items.len() == 1 => items.remove(0),
            Value::Array(items) => {
                return Err(ExplainError::Malformed(format!("expected one assessment, got {}", items.len())));
            }
            other => other,
        };

        serde_json::from_value(object).map_err(|e| ExplainError::Malformed(e.to_string()))
    }

    /// Multi-line text attached to the event
    pub fn to_text(&self) -> String {
        format!(
            "[{}] {}\n\nMITRE: {}\n\nSummary: {}\n\nImpact: {}\n\nRecommendation: {}\n\nEvidence: {}",
            self.threat_level,
            self.attack_type,
            self.mitre_technique,
            self.summary,
            self.impact,
            self.recommendation,
            self.data_evidence,
        )
    }
}

mod patterns {
    use std::sync::LazyLock;

    use regex::Regex;

    pub static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("valid regex")
    });

    pub static RESULT_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*result\s*=\s*").expect("valid regex")
    });
}
