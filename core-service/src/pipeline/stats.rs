use serde::{Deserialize, Serialize};

use crate::model::{Confidence, ScoreResult};

/// Monotonic pipeline counters. Confidence counts cover anomalies only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_flows: u64,
    pub total_anomaly: u64,
    pub total_normal: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl Stats {
    pub fn record(&mut self, score: &ScoreResult) {
        self.total_flows += 1;

        if !score.is_anomaly {
            self.total_normal += 1;
            return;
        }

        self.total_anomaly += 1;
        match score.confidence {
            Confidence::High => self.high += 1,
            Confidence::Medium => self.medium += 1,
            Confidence::Low => self.low += 1,
        }
    }
}
