use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};

use crate::config::Settings;
use crate::services::{
    DiscoveryEngine, NmapEngine, NucleiEngine, ReputationLookup, ReputationService,
    ScanOrchestrator, TemplateEngine,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<ScanOrchestrator>,
}

impl AppState {
    /// Create new application state: probe the external engines once and
    /// wire them into the orchestrator.
    pub async fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);

        let capabilities = services::probe::detect(&settings).await;

        let discovery: Arc<dyn DiscoveryEngine> =
            Arc::new(NmapEngine::new(settings.nmap_path.clone()));
        let templates: Arc<dyn TemplateEngine> = Arc::new(NucleiEngine::new(
            settings.nuclei_path.clone(),
            capabilities.nuclei,
            Duration::from_secs(settings.vuln_scan_timeout_seconds),
        ));
        let reputation: Arc<dyn ReputationLookup> = Arc::new(ReputationService::new(&settings));

        let orchestrator = Arc::new(ScanOrchestrator::new(
            Arc::clone(&settings),
            capabilities,
            discovery,
            templates,
            reputation,
        ));

        Self {
            settings,
            orchestrator,
        }
    }

    /// Assemble state around an existing orchestrator (used by tests to
    /// inject stub engines).
    pub fn with_orchestrator(settings: Arc<Settings>, orchestrator: Arc<ScanOrchestrator>) -> Self {
        Self {
            settings,
            orchestrator,
        }
    }
}

/// API routes shared by the server binary and the integration tests.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/scan", post(handlers::execute_scan))
        .route("/api/scan/history", get(handlers::scan_history))
        .route("/api/scan/active", get(handlers::active_scans))
        .route("/api/analysis", post(handlers::analyze))
        .route("/api/tools/status", get(handlers::tools_status))
        .route("/api/health", get(handlers::health_check))
        .with_state(state)
}
