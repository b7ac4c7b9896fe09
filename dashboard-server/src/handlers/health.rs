//! Service info and health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use threatflow_core::constants::{APP_NAME, APP_VERSION};
use threatflow_core::features::LayoutInfo;
use threatflow_core::model::{ModelKind, ScoringPolicy};

use crate::AppState;

#[derive(Serialize)]
pub struct ServiceInfo {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    models: Vec<ModelKind>,
    policy: ScoringPolicy,
    layout: LayoutInfo,
    subscribers: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

pub async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "online",
        service: APP_NAME,
        version: APP_VERSION,
        models: ModelKind::ALL.to_vec(),
        policy: *state.analyzer().scorer().policy(),
        layout: LayoutInfo::current(),
        subscribers: state.pipeline.registry().len(),
    })
}

pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
