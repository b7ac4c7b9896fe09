//! Features Module - Canonical Feature Normalization
//!
//! Turns raw flow records from any ingest source into the fixed-order
//! feature vector the scoring collaborators were trained on.

pub mod layout;
pub mod vector;
pub mod record;
pub mod aliases;
pub mod normalizer;

#[cfg(test)]
mod tests;

// Re-export common types
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION, LayoutInfo, feature_index, feature_name};
pub use vector::FeatureVector;
pub use record::{FlowRecord, FlowSummary, RawSchema};
pub use normalizer::{FeatureNormalizer, FlowCounters, NormalizeError};
