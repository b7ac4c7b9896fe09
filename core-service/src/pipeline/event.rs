use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::FlowSummary;
use crate::model::ScoreResult;
use super::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Anomaly,
    Normal,
}

/// One scored flow. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub flow: FlowSummary,
    pub prediction: ScoreResult,
    /// Present on anomalies only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Counters right after this event was recorded
    pub stats: Stats,
}

impl Event {
    pub fn new(flow: FlowSummary, prediction: ScoreResult, explanation: Option<String>, stats: Stats) -> Self {
        let kind = if prediction.is_anomaly { EventKind::Anomaly } else { EventKind::Normal };
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            flow,
            prediction,
            explanation: explanation.filter(|_| kind == EventKind::Anomaly),
            stats,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        self.kind == EventKind::Anomaly
    }
}
