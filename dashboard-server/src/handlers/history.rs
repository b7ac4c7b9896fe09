//! Stats and history handlers

use axum::{extract::{Query, State}, Json};
use serde::Deserialize;
use threatflow_core::pipeline::{Event, Stats};
use validator::Validate;

use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct LimitQuery {
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> AppResult<usize> {
        self.validate()?;
        Ok(self.limit.unwrap_or(default))
    }
}

pub async fn stats(State(state): State<AppState>) -> Json<Stats> {
    Json(state.history().stats())
}

/// Newest-first events
pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Event>>> {
    let limit = query.resolve(50)?;
    Ok(Json(state.history().recent_events(limit)))
}

/// Newest-first anomalies
pub async fn anomalies(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<Vec<Event>>> {
    let limit = query.resolve(20)?;
    Ok(Json(state.history().recent_anomalies(limit)))
}
