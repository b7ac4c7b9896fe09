//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema the classifiers were trained on.**
//!
//! ## Rules:
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Names are the training column names. Raw sources never index into this
//! list by position; they resolve through the alias table in `aliases.rs`.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in the exact order the scaler and classifiers expect
pub const FEATURE_LAYOUT: &[&str] = &[
    "Fwd Header Length",            // 0
    "Destination Port",             // 1
    "Flow Duration",                // 2: microseconds
    "Total Length of Fwd Packets",  // 3
    "Total Length of Bwd Packets",  // 4
    "Fwd Packet Length Std",        // 5
    "Bwd Packet Length Std",        // 6
    "Flow Bytes/s",                 // 7
    "Flow Packets/s",               // 8
    "Total Fwd Packets",            // 9
    "Total Backward Packets",       // 10
    "Init_Win_bytes_forward",       // 11
    "Init_Win_bytes_backward",      // 12
    "Avg Fwd Segment Size",         // 13
    "Avg Bwd Segment Size",         // 14
    "Average Packet Size",          // 15
    "Packet Length Mean",           // 16
    "Fwd IAT Std",                  // 17
    "Bwd IAT Std",                  // 18
    "Flow IAT Mean",                // 19
    "Flow IAT Std",                 // 20
    "Flow IAT Max",                 // 21
    "Fwd IAT Mean",                 // 22
    "Bwd IAT Mean",                 // 23
    "ACK Flag Count",               // 24
    "SYN Flag Count",               // 25
    "FIN Flag Count",               // 26
    "PSH Flag Count",               // 27
    "URG Flag Count",               // 28
    "Subflow Fwd Packets",          // 29
    "Subflow Bwd Packets",          // 30
    "Subflow Fwd Bytes",            // 31
    "Subflow Bwd Bytes",            // 32
    "Fwd Packets/s",                // 33
    "Bwd Packets/s",                // 34
    "Down/Up Ratio",                // 35
];

/// Total number of features
/// Must match FEATURE_LAYOUT.len()
pub const FEATURE_COUNT: usize = 36;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

/// Get layout hash
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for the service info endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when a feature vector was built under a different layout
#[derive(Debug, Clone, thiserror::Error)]
#[error("feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), got v{actual_version} (hash: {actual_hash:08x})")]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}
