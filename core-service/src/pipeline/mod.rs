//! Pipeline Module - Ingest → score → broadcast → persist
//!
//! `EventPipeline` is the single producer. It runs on its own OS thread,
//! pulls records from a `FlowSource` in capture order, and for each flow
//! commits an event to `PipelineState`, fans it out through the
//! `SubscriberRegistry` and journals anomalies.

pub mod analyzer;
pub mod event;
pub mod history;
pub mod state;
pub mod stats;

#[cfg(test)]
mod tests;

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::capture::FlowSource;
use crate::constants::PROGRESS_LOG_EVERY;
use crate::features::FlowRecord;
use crate::journal::AnomalyJournal;
use crate::subscribers::{DeliveryError, StreamMessage, Subscriber, SubscriberId, SubscriberRegistry};

pub use analyzer::{Analysis, AnalyzeError, FlowAnalyzer};
pub use event::{Event, EventKind};
pub use history::HistoryBuffer;
pub use state::PipelineState;
pub use stats::Stats;

/// Counts for one `run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub processed: u64,
    pub anomalies: u64,
    pub invalid: u64,
    pub scoring_failures: u64,
}

pub struct EventPipeline {
    analyzer: FlowAnalyzer,
    state: Arc<PipelineState>,
    registry: Arc<SubscriberRegistry>,
    journal: Option<Arc<AnomalyJournal>>,
}

impl EventPipeline {
    pub fn new(analyzer: FlowAnalyzer, state: Arc<PipelineState>, registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            analyzer,
            state,
            registry,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Arc<AnomalyJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn analyzer(&self) -> &FlowAnalyzer {
        &self.analyzer
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Register a live subscriber. It receives the init snapshot first, then
    /// every event committed after the snapshot.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Result<SubscriberId, DeliveryError> {
        self.registry.register(subscriber, || self.state.init_message())
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.registry.unregister(id);
    }

    /// Run one record through the pipeline. Records that fail normalization
    /// or scoring are dropped and leave no trace in stats or history.
    pub fn process(&self, record: &FlowRecord) -> Result<Event, AnalyzeError> {
        let analysis = self.analyzer.analyze(record)?;

        let (event, _) = self.registry.publish(|| {
            let event = self.state.commit(analysis.flow, analysis.score, analysis.explanation);
            let message = StreamMessage::Event(event.clone());
            (event, message)
        });

        if event.is_anomaly() {
            log::warn!(
                "[ANOMALY] {} -> {} {} score={:.4} confidence={}",
                event.flow.source(),
                event.flow.destination(),
                event.flow.proto,
                event.prediction.ensemble_score,
                event.prediction.confidence
            );

            if let Some(journal) = &self.journal {
                if let Err(e) = journal.append(&event) {
                    log::error!("{}", e);
                }
            }
        } else if event.stats.total_normal % PROGRESS_LOG_EVERY == 0 {
            log::info!(
                "Processed {} flows ({} anomalies)",
                event.stats.total_flows,
                event.stats.total_anomaly
            );
        }

        Ok(event)
    }

    /// Drain `source` until end of stream or a read error
    pub fn run(&self, source: &mut dyn FlowSource) -> PipelineSummary {
        let mut summary = PipelineSummary::default();

        loop {
            let record = match source.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    log::error!("Capture source failed: {}", e);
                    break;
                }
            };

            match self.process(&record) {
                Ok(event) => {
                    summary.processed += 1;
                    if event.is_anomaly() {
                        summary.anomalies += 1;
                    }
                }
                Err(AnalyzeError::InvalidRecord(e)) => {
                    summary.invalid += 1;
                    log::debug!("Dropping record: {}", e);
                }
                Err(AnalyzeError::ScoringFailure(e)) => {
                    summary.scoring_failures += 1;
                    log::warn!("Dropping record: scoring failed: {}", e);
                }
            }
        }

        log::info!(
            "Capture source exhausted: {} processed, {} anomalies, {} invalid, {} scoring failures",
            summary.processed,
            summary.anomalies,
            summary.invalid,
            summary.scoring_failures
        );
        summary
    }

    /// Run on a dedicated thread
    pub fn spawn(self: Arc<Self>, mut source: Box<dyn FlowSource>) -> io::Result<JoinHandle<PipelineSummary>> {
        thread::Builder::new()
            .name("event-pipeline".to_string())
            .spawn(move || {
                log::info!("Event pipeline started");
                self.run(source.as_mut())
            })
    }
}
