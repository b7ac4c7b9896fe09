use serde::{Deserialize, Serialize};

use crate::pipeline::{Event, Stats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitKind {
    #[serde(rename = "init")]
    Init,
}

/// Point-in-time view of stats and recent history, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub stats: Stats,
    pub events: Vec<Event>,
    pub anomalies: Vec<Event>,
}

/// First message every subscriber receives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitMessage {
    #[serde(rename = "type")]
    pub kind: InitKind,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl InitMessage {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { kind: InitKind::Init, snapshot }
    }
}

/// Wire message of the live stream; the `type` field tells them apart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamMessage {
    Init(InitMessage),
    Event(Event),
}

impl StreamMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
