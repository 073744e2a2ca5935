use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use gungnir::config::Settings;
use gungnir::error::{ApiError, ApiResult};
use gungnir::models::{
    HostRecord, HostState, PortRecord, PortState, ReputationVerdict, ScanProfile, Transport,
    VulnScanSection,
};
use gungnir::services::{
    Capabilities, DiscoveryEngine, ReputationLookup, ScanOrchestrator, TemplateEngine,
};
use gungnir::{api_router, AppState};

/// Scripted outcome for the discovery stub.
pub enum StubOutcome {
    Hosts(Vec<HostRecord>),
    Timeout,
}

pub struct StubDiscovery {
    pub outcome: StubOutcome,
}

#[async_trait]
impl DiscoveryEngine for StubDiscovery {
    async fn discover(&self, _target: &str, _profile: ScanProfile) -> ApiResult<Vec<HostRecord>> {
        match &self.outcome {
            StubOutcome::Hosts(hosts) => Ok(hosts.clone()),
            StubOutcome::Timeout => Err(ApiError::scan_timeout(
                "discovery scan timed out after 60 seconds",
            )),
        }
    }
}

pub struct StubTemplates;

#[async_trait]
impl TemplateEngine for StubTemplates {
    async fn scan(&self, target: &str) -> VulnScanSection {
        VulnScanSection::from_findings(target, Vec::new())
    }
}

pub struct StubReputation;

#[async_trait]
impl ReputationLookup for StubReputation {
    async fn lookup(&self, ip: &str) -> ReputationVerdict {
        ReputationVerdict::unknown(ip)
    }
}

/// One live host exposing an open telnet port.
pub fn telnet_host(ip: &str) -> HostRecord {
    let mut port = PortRecord::new(23, Transport::Tcp, PortState::Open);
    port.service = "telnet".to_string();
    let mut host = HostRecord::new(ip.to_string());
    host.state = HostState::Up;
    host.ports.push(port);
    host
}

/// Build a test application around stub engines.
pub fn test_app(outcome: StubOutcome) -> Router {
    let settings = Arc::new(Settings::from_env(false).expect("test settings"));

    let orchestrator = Arc::new(ScanOrchestrator::new(
        Arc::clone(&settings),
        Capabilities {
            nmap: true,
            nuclei: false,
        },
        Arc::new(StubDiscovery { outcome }),
        Arc::new(StubTemplates),
        Arc::new(StubReputation),
    ));

    api_router(AppState::with_orchestrator(settings, orchestrator))
}
