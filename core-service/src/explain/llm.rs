//! LLM Explainer
//!
//! Blocking client for an OpenAI-compatible chat completions endpoint. The
//! model is asked for a JSON assessment, which is parsed strictly.

use std::time::Duration;

use serde::Deserialize;

use crate::config::ExplainerConfig;
use crate::model::ScoreResult;
use super::types::{ExplainError, KeyIndicators, ThreatAssessment};
use super::Explainer;

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct LlmExplainer {
    agent: ureq::Agent,
    url: String,
    model: String,
    api_key: String,
}

impl LlmExplainer {
    /// Requires an API key; without one use `DisabledExplainer`
    pub fn new(config: &ExplainerConfig) -> Result<Self, ExplainError> {
        let api_key = config.api_key.clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExplainError::Disabled)?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        Ok(Self {
            agent,
            url: config.url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn request_body(&self, score: &ScoreResult, indicators: &KeyIndicators) -> String {
        serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(score, indicators) }],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        })
        .to_string()
    }
}

impl Explainer for LlmExplainer {
    fn explain(&self, score: &ScoreResult, indicators: &KeyIndicators) -> Result<String, ExplainError> {
        let response = self.agent.post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_string(&self.request_body(score, indicators));

        let body = match response {
            Ok(resp) => resp.into_string()
                .map_err(|e| ExplainError::Transport(e.to_string()))?,
            Err(ureq::Error::Status(status, _)) => return Err(ExplainError::Status { status }),
            Err(e) => return Err(ExplainError::Transport(e.to_string())),
        };

        let chat: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ExplainError::Malformed(e.to_string()))?;

        let content = chat.choices.into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ExplainError::EmptyResponse)?;

        ThreatAssessment::parse(&content).map(|assessment| assessment.to_text())
    }
}

/// Prompt grounded in the score breakdown and key indicators only
pub fn build_prompt(score: &ScoreResult, indicators: &KeyIndicators) -> String {
    format!(
        r#"You are an experienced SOC (Security Operation Center) analyst assistant.
Analyze the network anomaly detection result from our ML ensemble.

RULES:
- Base your analysis ONLY on the data and scores below
- Do NOT invent attack types the data does not support
- Quote actual values from the input data
- Be specific and actionable

=== ENSEMBLE DETECTION RESULT ===
Status          : {status}
Ensemble Score  : {ensemble} (0=normal, 1=certain anomaly)
Tabular Score   : {tabular}
Sequence Score  : {sequence}
Residual Score  : {residual}
Confidence      : {confidence}

=== KEY INDICATORS ===
SYN_Flag_Count      : {syn}
Flow_Packets_s      : {pps}
Flow_Bytes_s        : {bps}
Total_Fwd_Packets   : {fwd}
Total_Bwd_Packets   : {bwd}
Destination_Port    : {port}

Respond ONLY with one JSON object, no preamble, no code fences:
{{
  "threat_level": "LOW|MEDIUM|HIGH|CRITICAL",
  "attack_type": "attack name",
  "mitre_technique": "MITRE ATT&CK technique ID and name",
  "summary": "summary based on the actual data",
  "impact": "potential impact",
  "recommendation": "specific mitigation steps",
  "data_evidence": "specific values that support the conclusion"
}}"#,
        status = score.status,
        ensemble = score.ensemble_score,
        tabular = score.tabular_score,
        sequence = score.sequence_score,
        residual = score.residual_score,
        confidence = score.confidence,
        syn = indicators.syn_flag_count,
        pps = indicators.flow_packets_s,
        bps = indicators.flow_bytes_s,
        fwd = indicators.total_fwd_packets,
        bwd = indicators.total_bwd_packets,
        port = indicators.destination_port,
    )
}
