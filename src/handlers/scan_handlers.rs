use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    error::ApiError,
    models::{ScanRequest, ScanResult, ScanRun},
    AppState,
};

/// Execute a full scan and return the merged result.
pub async fn execute_scan(
    State(app_state): State<AppState>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<ScanResult>, ApiError> {
    let result = app_state.orchestrator.execute_scan(payload).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub scans: Vec<ScanResult>,
    pub total: usize,
}

/// Last N completed/failed runs plus the total run count. Read-only.
pub async fn scan_history(
    State(app_state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let (scans, total) = app_state.orchestrator.history(params.limit).await;
    Json(HistoryResponse { scans, total })
}

#[derive(Debug, Serialize)]
pub struct ActiveScansResponse {
    pub active_scans: HashMap<String, ScanRun>,
}

/// All runs currently tracked in the in-flight table.
pub async fn active_scans(State(app_state): State<AppState>) -> Json<ActiveScansResponse> {
    let active_scans = app_state.orchestrator.active_runs().await;
    Json(ActiveScansResponse { active_scans })
}
