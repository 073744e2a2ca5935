use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::{
    models::{AnalysisRequest, AnalysisResult},
    services::analysis,
    AppState,
};

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub analysis: AnalysisResult,
}

/// Run the rule engine over a minimal wrapped record, without requiring a
/// prior scan. The free-form payload carries no host data, so the result
/// reflects an empty exposure profile.
pub async fn analyze(
    State(_app_state): State<AppState>,
    Json(payload): Json<AnalysisRequest>,
) -> Json<AnalysisResponse> {
    tracing::debug!(
        analysis_type = %payload.analysis_type,
        payload_bytes = payload.data.len(),
        "running standalone analysis"
    );
    let analysis = analysis::analyze(&[], &payload.analysis_type);
    Json(AnalysisResponse { analysis })
}
