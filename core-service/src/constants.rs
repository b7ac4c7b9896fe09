//! Central Configuration Constants
//!
//! Single source of truth for pipeline and policy defaults.
//! Runtime overrides live in `config.rs`.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "ThreatFlow SOC";

// ============================================
// Scoring policy
// ============================================

/// Default ensemble weight of the tabular (gradient boosted) classifier
pub const DEFAULT_WEIGHT_TABULAR: f64 = 0.50;

/// Default ensemble weight of the sequence (1D CNN) classifier
pub const DEFAULT_WEIGHT_SEQUENCE: f64 = 0.20;

/// Default ensemble weight of the residual network classifier
pub const DEFAULT_WEIGHT_RESIDUAL: f64 = 0.30;

/// Ensemble score at or above which a flow is an anomaly.
/// Not derived from the confidence breakpoints.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.35;

/// Confidence band breakpoints
pub const CONFIDENCE_HIGH: f64 = 0.85;
pub const CONFIDENCE_MEDIUM: f64 = 0.65;

/// Decimal places used when presenting scores
pub const SCORE_DECIMALS: i32 = 4;

// ============================================
// Normalization
// ============================================

/// Duration floor (seconds) used for rate features
pub const MIN_DURATION_SECS: f64 = 1e-9;

/// Forward header length assumed when the source does not report one
pub const DEFAULT_FWD_HEADER_LENGTH: f64 = 20.0;

// ============================================
// Pipeline
// ============================================

/// All-events history capacity
pub const DEFAULT_EVENT_HISTORY: usize = 200;

/// Anomaly-only history capacity
pub const DEFAULT_ANOMALY_HISTORY: usize = 50;

/// Events included in a subscriber init snapshot
pub const DEFAULT_INIT_EVENTS: usize = 50;

/// Anomalies included in a subscriber init snapshot
pub const DEFAULT_INIT_ANOMALIES: usize = 20;

/// Per-subscriber queue depth before the subscriber counts as failed
pub const DEFAULT_SUBSCRIBER_QUEUE: usize = 256;

/// Normal flows between progress log lines
pub const PROGRESS_LOG_EVERY: u64 = 100;

/// Explanation used when the explainer cannot produce one
pub const EXPLANATION_PLACEHOLDER: &str = "LLM explanation unavailable";

// ============================================
// Explainer
// ============================================

/// Default OpenAI-compatible chat completions endpoint
pub const DEFAULT_EXPLAINER_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default explainer model
pub const DEFAULT_EXPLAINER_MODEL: &str = "llama-3.3-70b-versatile";

/// Default explainer request timeout (seconds)
pub const DEFAULT_EXPLAINER_TIMEOUT_SECS: u64 = 20;

// ============================================
// Capture
// ============================================

/// Poll interval when a tailed capture file has no new lines (ms)
pub const CAPTURE_POLL_INTERVAL_MS: u64 = 50;
