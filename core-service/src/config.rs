//! Service Configuration
//!
//! Typed runtime configuration with defaults from `constants.rs`. Values come
//! from the environment (the server loads `.env` first). Scoring policy and
//! schema values must parse; other unparsable values fall back to the
//! default with a warning.

use std::env;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::features::RawSchema;
use crate::model::{EnsembleWeights, ScoringPolicy};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid scoring policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Persisted scaler parameters and the three exported classifiers
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    pub scaler: PathBuf,
    pub tabular: PathBuf,
    pub sequence: PathBuf,
    pub residual: PathBuf,
}

impl ModelArtifacts {
    /// Default file names inside one model directory
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            scaler: dir.join("scaler.json"),
            tabular: dir.join("xgboost_model.onnx"),
            sequence: dir.join("cnn_model.onnx"),
            residual: dir.join("resnet_best.onnx"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainerConfig {
    /// No key → explainer disabled
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_EXPLAINER_URL.to_string(),
            model: DEFAULT_EXPLAINER_MODEL.to_string(),
            timeout_secs: DEFAULT_EXPLAINER_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// JSON-lines file to read, `-` for stdin. None disables the live pipeline.
    pub source: Option<PathBuf>,
    pub schema: RawSchema,
    /// Replay the file from the beginning instead of tailing new lines
    pub from_start: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: None,
            schema: RawSchema::Eve,
            from_start: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub events: usize,
    pub anomalies: usize,
    pub init_events: usize,
    pub init_anomalies: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            events: DEFAULT_EVENT_HISTORY,
            anomalies: DEFAULT_ANOMALY_HISTORY,
            init_events: DEFAULT_INIT_EVENTS,
            init_anomalies: DEFAULT_INIT_ANOMALIES,
        }
    }
}

// ============================================================================
// SERVICE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub artifacts: ModelArtifacts,
    pub policy: ScoringPolicy,
    pub capture: CaptureConfig,
    pub anomaly_log: PathBuf,
    pub explainer: ExplainerConfig,
    pub history: HistoryLimits,
    pub subscriber_queue: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            artifacts: ModelArtifacts::from_dir(Path::new("models")),
            policy: ScoringPolicy::default(),
            capture: CaptureConfig::default(),
            anomaly_log: default_anomaly_log(),
            explainer: ExplainerConfig::default(),
            history: HistoryLimits::default(),
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let model_dir = lookup("MODEL_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("models"));
        let dir_artifacts = ModelArtifacts::from_dir(&model_dir);
        let artifacts = ModelArtifacts {
            scaler: lookup("SCALER_PATH").map(PathBuf::from).unwrap_or(dir_artifacts.scaler),
            tabular: lookup("TABULAR_MODEL_PATH").map(PathBuf::from).unwrap_or(dir_artifacts.tabular),
            sequence: lookup("SEQUENCE_MODEL_PATH").map(PathBuf::from).unwrap_or(dir_artifacts.sequence),
            residual: lookup("RESIDUAL_MODEL_PATH").map(PathBuf::from).unwrap_or(dir_artifacts.residual),
        };

        let weights = EnsembleWeights {
            tabular: strict(&lookup, "WEIGHT_TABULAR", DEFAULT_WEIGHT_TABULAR)?,
            sequence: strict(&lookup, "WEIGHT_SEQUENCE", DEFAULT_WEIGHT_SEQUENCE)?,
            residual: strict(&lookup, "WEIGHT_RESIDUAL", DEFAULT_WEIGHT_RESIDUAL)?,
        };
        let threshold = strict(&lookup, "ANOMALY_THRESHOLD", DEFAULT_ANOMALY_THRESHOLD)?;
        let policy = ScoringPolicy::new(weights, threshold)?;

        let schema = match lookup("CAPTURE_SCHEMA") {
            Some(raw) => raw.parse::<RawSchema>()
                .map_err(|_| ConfigError::InvalidValue { key: "CAPTURE_SCHEMA", value: raw })?,
            None => defaults.capture.schema,
        };
        let capture = CaptureConfig {
            source: lookup("CAPTURE_SOURCE").filter(|s| !s.trim().is_empty()).map(PathBuf::from),
            schema,
            from_start: flag(&lookup, "CAPTURE_FROM_START"),
        };

        let explainer = ExplainerConfig {
            api_key: lookup("EXPLAINER_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .filter(|k| !k.trim().is_empty()),
            url: lookup("EXPLAINER_URL").unwrap_or(defaults.explainer.url),
            model: lookup("EXPLAINER_MODEL").unwrap_or(defaults.explainer.model),
            timeout_secs: parse_or_u64(&lookup, "EXPLAINER_TIMEOUT_SECS", DEFAULT_EXPLAINER_TIMEOUT_SECS),
        };

        let history = HistoryLimits {
            events: positive(&lookup, "HISTORY_EVENTS", DEFAULT_EVENT_HISTORY),
            anomalies: positive(&lookup, "HISTORY_ANOMALIES", DEFAULT_ANOMALY_HISTORY),
            init_events: parsed(&lookup, "INIT_EVENTS").unwrap_or(DEFAULT_INIT_EVENTS),
            init_anomalies: parsed(&lookup, "INIT_ANOMALIES").unwrap_or(DEFAULT_INIT_ANOMALIES),
        };

        Ok(Self {
            artifacts,
            policy,
            capture,
            anomaly_log: lookup("ANOMALY_LOG").map(PathBuf::from).unwrap_or(defaults.anomaly_log),
            explainer,
            history,
            subscriber_queue: positive(&lookup, "SUBSCRIBER_QUEUE", DEFAULT_SUBSCRIBER_QUEUE),
        })
    }
}

fn parsed<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring unparsable {}={:?}, using default", key, raw);
            None
        }
    }
}

/// Absent means default; present but unparsable is an error
fn strict<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_or_u64<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u64) -> u64 {
    parsed(lookup, key).unwrap_or(default)
}

/// Zero capacities are replaced by the default
fn positive<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: usize) -> usize {
    parsed(lookup, key).filter(|v: &usize| *v > 0).unwrap_or(default)
}

fn flag<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str) -> bool {
    lookup(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn default_anomaly_log() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("threatflow")
        .join("anomaly_detected.jsonl")
}
