//! Shared pipeline state: counters and both history buffers behind one lock.
//!
//! The pipeline thread is the only writer. Readers get cloned snapshots.

use parking_lot::RwLock;

use crate::config::HistoryLimits;
use crate::features::FlowSummary;
use crate::model::ScoreResult;
use crate::subscribers::{InitMessage, Snapshot, StreamMessage};
use super::event::Event;
use super::history::HistoryBuffer;
use super::stats::Stats;

struct Inner {
    stats: Stats,
    events: HistoryBuffer<Event>,
    anomalies: HistoryBuffer<Event>,
}

pub struct PipelineState {
    inner: RwLock<Inner>,
    limits: HistoryLimits,
}

impl PipelineState {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            inner: RwLock::new(Inner {
                stats: Stats::default(),
                events: HistoryBuffer::new(limits.events),
                anomalies: HistoryBuffer::new(limits.anomalies),
            }),
            limits,
        }
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    /// Count the flow, build its event with the updated counters and append
    /// it to history, all under one write lock.
    pub fn commit(&self, flow: FlowSummary, prediction: ScoreResult, explanation: Option<String>) -> Event {
        let mut inner = self.inner.write();
        inner.stats.record(&prediction);

        let event = Event::new(flow, prediction, explanation, inner.stats);
        if event.is_anomaly() {
            inner.anomalies.push(event.clone());
        }
        inner.events.push(event.clone());
        event
    }

    pub fn stats(&self) -> Stats {
        self.inner.read().stats
    }

    pub fn recent_events(&self, limit: usize) -> Vec<Event> {
        self.inner.read().events.newest(limit)
    }

    pub fn recent_anomalies(&self, limit: usize) -> Vec<Event> {
        self.inner.read().anomalies.newest(limit)
    }

    /// Consistent view of counters and history
    pub fn snapshot(&self, events: usize, anomalies: usize) -> Snapshot {
        let inner = self.inner.read();
        Snapshot {
            stats: inner.stats,
            events: inner.events.newest(events),
            anomalies: inner.anomalies.newest(anomalies),
        }
    }

    /// Init message for a newly registered subscriber
    pub fn init_message(&self) -> StreamMessage {
        let snapshot = self.snapshot(self.limits.init_events, self.limits.init_anomalies);
        StreamMessage::Init(InitMessage::new(snapshot))
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(HistoryLimits::default())
    }
}
