//! Scaler Collaborator
//!
//! Pre-fitted affine transform applied before every classifier. Values are
//! NOT clipped: out-of-range inputs must stay visible to the classifiers.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::FEATURE_COUNT;
use super::classifier::ModelLoadError;

/// Same cardinality in and out
pub trait Scaler: Send + Sync {
    fn transform(&self, values: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT];
}

/// Persisted standard-scaler parameters, exported from the training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Pass-through scaler
    pub fn identity() -> Self {
        Self {
            mean: [0.0; FEATURE_COUNT],
            scale: [1.0; FEATURE_COUNT],
        }
    }

    /// Load `{ "mean": [...], "scale": [...] }` from disk
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params: ScalerParams = serde_json::from_str(&raw).map_err(|e| ModelLoadError::InvalidArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let scaler = Self::from_params(params).map_err(|reason| ModelLoadError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        })?;

        log::info!("Scaler loaded from {}", path.display());
        Ok(scaler)
    }

    pub fn from_params(params: ScalerParams) -> Result<Self, String> {
        let mean = to_array("mean", params.mean)?;
        let mut scale = to_array("scale", params.scale)?;

        // Constant columns: zero scale behaves as 1.0
        for s in scale.iter_mut() {
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Ok(Self { mean, scale })
    }
}

fn to_array(field: &str, values: Vec<f64>) -> Result<[f64; FEATURE_COUNT], String> {
    let len = values.len();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("{} contains non-finite values", field));
    }
    values.try_into()
        .map_err(|_| format!("{} has {} values, expected {}", field, len, FEATURE_COUNT))
}

impl Scaler for StandardScaler {
    fn transform(&self, values: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            out[i] = (values[i] - self.mean[i]) / self.scale[i];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn params(mean: f64, scale: f64) -> ScalerParams {
        ScalerParams {
            mean: vec![mean; FEATURE_COUNT],
            scale: vec![scale; FEATURE_COUNT],
        }
    }

    #[test]
    fn test_transform_is_not_clipped() {
        let scaler = StandardScaler::from_params(params(10.0, 2.0)).unwrap();
        let mut values = [10.0; FEATURE_COUNT];
        values[0] = 1_000_010.0;

        let out = scaler.transform(&values);
        assert_eq!(out[0], 500_000.0);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_zero_scale_treated_as_one() {
        let scaler = StandardScaler::from_params(params(1.0, 0.0)).unwrap();
        let out = scaler.transform(&[3.0; FEATURE_COUNT]);
        assert!(out.iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_cardinality_mismatch() {
        let err = StandardScaler::from_params(ScalerParams {
            mean: vec![0.0; 35],
            scale: vec![1.0; FEATURE_COUNT],
        }).unwrap_err();
        assert!(err.contains("35"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&params(0.5, 4.0)).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let scaler = StandardScaler::load(file.path()).unwrap();
        assert_eq!(scaler.transform(&[4.5; FEATURE_COUNT])[7], 1.0);
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("scaler.json");
        assert!(matches!(StandardScaler::load(&missing), Err(ModelLoadError::NotFound(_))));

        std::fs::write(&missing, "{\"mean\": [1.0]}").unwrap();
        assert!(matches!(
            StandardScaler::load(&missing),
            Err(ModelLoadError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_identity() {
        let values = [7.25; FEATURE_COUNT];
        assert_eq!(StandardScaler::identity().transform(&values), values);
    }
}
