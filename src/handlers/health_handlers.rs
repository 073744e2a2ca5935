use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::AppState;

/// Health check with capability flags and run counts.
pub async fn health_check(State(app_state): State<AppState>) -> Json<Value> {
    let capabilities = app_state.orchestrator.capabilities();
    let (active_scans, total_scans) = app_state.orchestrator.run_counts().await;

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "capabilities": {
            "nmap": capabilities.nmap,
            "nuclei": capabilities.nuclei,
            "analysis": true,
            "reputation": true,
        },
        "active_scans": active_scans,
        "total_scans": total_scans,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Capability map plus which optional credentials are configured.
pub async fn tools_status(State(app_state): State<AppState>) -> Json<Value> {
    let capabilities = app_state.orchestrator.capabilities();

    Json(json!({
        "tools": capabilities,
        "config": {
            "has_virustotal_key": app_state.settings.virustotal_api_key.is_some(),
            "has_abuseipdb_key": app_state.settings.abuseipdb_api_key.is_some(),
            "has_analysis_key": app_state.settings.analysis_api_key.is_some(),
        }
    }))
}

/// Service banner.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Gungnir API",
        "description": "Reconnaissance orchestration with risk scoring and threat intelligence",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
