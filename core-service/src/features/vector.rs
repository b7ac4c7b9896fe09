//! Feature Vector - Core data structure for scoring input
//!
//! **Versioned, sanitized feature vector**
//!
//! Values are stored in the order defined by `layout.rs`. Every constructor
//! sanitizes its input, so a `FeatureVector` never holds NaN or infinite values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use super::layout::{
    FEATURE_COUNT, FEATURE_VERSION, FEATURE_LAYOUT,
    layout_hash, validate_layout, LayoutMismatchError,
};

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    #[serde(with = "values_serde")]
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create a zeroed feature vector with current version
    pub fn zeroed() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }

    /// Create from raw values, replacing NaN/infinite entries with 0.0
    pub fn from_values(mut values: [f64; FEATURE_COUNT]) -> Self {
        for v in values.iter_mut() {
            *v = sanitize(*v);
        }
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Get values as array reference
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        super::layout::feature_index(name).and_then(|i| self.get(i))
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// Check if this vector is compatible with current layout
    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }

    /// Named view of the vector, keyed by training column name
    pub fn named_values(&self) -> BTreeMap<&'static str, f64> {
        FEATURE_LAYOUT.iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }

    /// Convert to JSON for diagnostics
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": self.named_values(),
        })
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

/// Replace NaN / ±inf with 0.0
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

// serde only derives for arrays up to 32 elements
mod values_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::FEATURE_COUNT;

    pub fn serialize<S: Serializer>(values: &[f64; FEATURE_COUNT], serializer: S) -> Result<S::Ok, S::Error> {
        values.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[f64; FEATURE_COUNT], D::Error> {
        let values = Vec::<f64>::deserialize(deserializer)?;
        let len = values.len();
        values.try_into()
            .map_err(|_| D::Error::invalid_length(len, &"36 feature values"))
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builder for creating FeatureVector with named setters
pub struct FeatureVectorBuilder {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVectorBuilder {
    pub fn new() -> Self {
        Self { values: [0.0; FEATURE_COUNT] }
    }

    /// Set feature by index, ignoring out-of-range indices
    pub fn set_index(&mut self, index: usize, value: f64) -> &mut Self {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
        self
    }

    /// Set feature by name. Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match super::layout::feature_index(name) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    pub fn build(self) -> FeatureVector {
        FeatureVector::from_values(self.values)
    }
}

impl Default for FeatureVectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
