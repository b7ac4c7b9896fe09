//! ThreatFlow Core
//!
//! Flow normalization, ensemble anomaly scoring and the live event pipeline
//! behind the ThreatFlow SOC dashboard.

pub mod constants;
pub mod config;
pub mod features;
pub mod model;
pub mod explain;
pub mod capture;
pub mod subscribers;
pub mod journal;
pub mod pipeline;

pub use config::{ConfigError, ServiceConfig};
pub use features::{FeatureNormalizer, FeatureVector, FlowRecord, FlowSummary, RawSchema};
pub use model::{EnsembleScorer, ScoreResult};
pub use journal::AnomalyJournal;
pub use pipeline::{AnalyzeError, EventPipeline, FlowAnalyzer, PipelineState};
pub use subscribers::SubscriberRegistry;
