//! Prediction handlers
//!
//! Scoring is CPU-bound and the explainer blocks on HTTP, so each request is
//! analyzed on the blocking pool.

use axum::{extract::{Query, State}, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use threatflow_core::model::ScoreResult;
use threatflow_core::pipeline::Analysis;
use threatflow_core::{FlowAnalyzer, FlowRecord, FlowSummary, RawSchema};

use crate::{AppResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    pub schema: RawSchema,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub prediction: ScoreResult,
    pub flow: FlowSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl From<Analysis> for PredictResponse {
    fn from(analysis: Analysis) -> Self {
        Self {
            prediction: analysis.score,
            flow: analysis.flow,
            explanation: analysis.explanation,
        }
    }
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub normal: usize,
    pub anomaly: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub summary: BatchSummary,
    pub results: Vec<PredictResponse>,
}

/// Score one flow
pub async fn predict(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
    Json(body): Json<Value>,
) -> AppResult<Json<PredictResponse>> {
    let analyzer = state.analyzer().clone();
    let record = FlowRecord::from_json(query.schema, body);

    let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&record)).await??;
    Ok(Json(analysis.into()))
}

/// Score many flows. Any failing record fails the whole batch.
pub async fn predict_batch(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
    Json(body): Json<Vec<Value>>,
) -> AppResult<Json<BatchResponse>> {
    let analyzer = state.analyzer().clone();
    let records: Vec<FlowRecord> = body.into_iter()
        .map(|value| FlowRecord::from_json(query.schema, value))
        .collect();

    let results = tokio::task::spawn_blocking(move || analyze_all(&analyzer, &records)).await??;

    let anomaly = results.iter().filter(|r| r.prediction.is_anomaly).count();
    let summary = BatchSummary {
        total: results.len(),
        normal: results.len() - anomaly,
        anomaly,
    };

    Ok(Json(BatchResponse { summary, results }))
}

fn analyze_all(analyzer: &FlowAnalyzer, records: &[FlowRecord]) -> Result<Vec<PredictResponse>, threatflow_core::AnalyzeError> {
    records.iter()
        .map(|record| analyzer.analyze(record).map(PredictResponse::from))
        .collect()
}
