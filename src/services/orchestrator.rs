//! Scan orchestration: sequences discovery, scoring, reputation
//! enrichment, the optional template scan and analysis per accepted
//! request, and tracks in-flight and historical runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;

use crate::config::Settings;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    HostState, ReputationVerdict, RunStatus, ScanProfile, ScanRequest, ScanResult, ScanRun,
    ScanSummary,
};
use crate::services::analysis;
use crate::services::discovery::DiscoveryEngine;
use crate::services::probe::Capabilities;
use crate::services::reputation::ReputationLookup;
use crate::services::risk;
use crate::services::vuln::TemplateEngine;

pub struct ScanOrchestrator {
    settings: Arc<Settings>,
    capabilities: Capabilities,
    discovery: Arc<dyn DiscoveryEngine>,
    templates: Arc<dyn TemplateEngine>,
    reputation: Arc<dyn ReputationLookup>,
    /// In-flight run table. Terminal entries stay visible until shutdown.
    runs: RwLock<HashMap<String, ScanRun>>,
    /// Append-only history of merged results, completed and failed alike.
    history: RwLock<Vec<ScanResult>>,
    run_permits: Arc<Semaphore>,
    sequence: AtomicU64,
}

impl ScanOrchestrator {
    pub fn new(
        settings: Arc<Settings>,
        capabilities: Capabilities,
        discovery: Arc<dyn DiscoveryEngine>,
        templates: Arc<dyn TemplateEngine>,
        reputation: Arc<dyn ReputationLookup>,
    ) -> Self {
        let max_concurrent = settings.max_concurrent_scans as usize;
        Self {
            settings,
            capabilities,
            discovery,
            templates,
            reputation,
            runs: RwLock::new(HashMap::new()),
            history: RwLock::new(Vec::new()),
            run_permits: Arc::new(Semaphore::new(max_concurrent)),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Execute one scan request end to end. Discovery failures fail the
    /// run (which is still recorded); reputation and template-scan
    /// failures degrade only their own section.
    pub async fn execute_scan(&self, request: ScanRequest) -> ApiResult<ScanResult> {
        crate::utils::validate_target(&request.target)?;

        if !self.capabilities.nmap {
            return Err(ApiError::engine_unavailable("nmap is not available"));
        }

        let _permit = self
            .run_permits
            .clone()
            .try_acquire_owned()
            .map_err(|_| {
                ApiError::capacity(format!(
                    "maximum of {} concurrent scans reached",
                    self.settings.max_concurrent_scans
                ))
            })?;

        let profile = ScanProfile::resolve(&request.profile);
        let mut run = ScanRun::new(self.next_run_id(), request.target.clone(), profile);
        self.store_run(&run).await;

        run.status = RunStatus::Running;
        self.store_run(&run).await;

        tracing::info!(
            run_id = %run.id,
            scan_target = %run.target,
            profile = %run.profile,
            "scan accepted"
        );

        let started = Instant::now();

        let mut hosts = match self.discovery.discover(&request.target, profile).await {
            Ok(hosts) => hosts,
            Err(e) => {
                run.status = RunStatus::Failed;
                run.finished_at = Some(Utc::now());
                run.error = Some(e.to_string());
                self.store_run(&run).await;

                let failed = ScanResult {
                    run: run.clone(),
                    duration_seconds: started.elapsed().as_secs_f64(),
                    hosts: Vec::new(),
                    summary: ScanSummary::default(),
                    vulnerability_scan: None,
                    analysis: None,
                };
                self.history.write().await.push(failed);

                tracing::warn!(run_id = %run.id, error = %e, "discovery stage failed");
                return Err(e);
            }
        };

        for host in hosts.iter_mut() {
            for port in host.ports.iter_mut() {
                port.risk_score = risk::score_port(port);
            }
            host.risk_score = risk::score_host(host);
        }

        let verdicts = self.lookup_reputation(&hosts).await;
        for host in hosts.iter_mut() {
            if let Some(verdict) = verdicts.get(&host.ip) {
                host.reputation = Some(verdict.clone());
            }
        }

        let summary = ScanSummary::compute(&hosts);

        let vulnerability_scan = if request.include_vulnerability_scan {
            Some(self.templates.scan(&request.target).await)
        } else {
            None
        };

        let analysis = if request.include_analysis {
            Some(analysis::analyze(&hosts, "comprehensive"))
        } else {
            None
        };

        run.status = RunStatus::Completed;
        run.finished_at = Some(Utc::now());
        self.store_run(&run).await;

        let result = ScanResult {
            run: run.clone(),
            duration_seconds: started.elapsed().as_secs_f64(),
            hosts,
            summary,
            vulnerability_scan,
            analysis,
        };
        self.history.write().await.push(result.clone());

        tracing::info!(
            run_id = %run.id,
            hosts = result.summary.total_hosts,
            open_ports = result.summary.open_ports,
            duration_secs = result.duration_seconds,
            "scan completed"
        );

        Ok(result)
    }

    /// Fan reputation lookups out over live hosts with bounded
    /// concurrency. Every lookup completes (or expires on its own
    /// deadline) before the merge continues.
    async fn lookup_reputation(
        &self,
        hosts: &[crate::models::HostRecord],
    ) -> HashMap<String, ReputationVerdict> {
        let live_ips: Vec<String> = hosts
            .iter()
            .filter(|h| h.state == HostState::Up && !h.ip.is_empty())
            .map(|h| h.ip.clone())
            .collect();

        let mut verdicts = HashMap::new();
        if live_ips.is_empty() {
            return verdicts;
        }

        let limit = Arc::new(Semaphore::new(
            self.settings.reputation_concurrency as usize,
        ));
        let mut lookups = JoinSet::new();

        for ip in live_ips {
            let lookup = Arc::clone(&self.reputation);
            let limit = Arc::clone(&limit);
            lookups.spawn(async move {
                let _permit = limit.acquire_owned().await.expect("semaphore closed");
                let verdict = lookup.lookup(&ip).await;
                (ip, verdict)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((ip, verdict)) => {
                    verdicts.insert(ip, verdict);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reputation lookup task failed");
                }
            }
        }

        verdicts
    }

    /// Last `limit` runs (oldest first) plus the total run count.
    pub async fn history(&self, limit: usize) -> (Vec<ScanResult>, usize) {
        let history = self.history.read().await;
        let total = history.len();
        let scans = history[total.saturating_sub(limit)..].to_vec();
        (scans, total)
    }

    /// Snapshot of the run table.
    pub async fn active_runs(&self) -> HashMap<String, ScanRun> {
        self.runs.read().await.clone()
    }

    /// (run table size, history size) for the health endpoint.
    pub async fn run_counts(&self) -> (usize, usize) {
        let runs = self.runs.read().await.len();
        let history = self.history.read().await.len();
        (runs, history)
    }

    async fn store_run(&self, run: &ScanRun) {
        self.runs.write().await.insert(run.id.clone(), run.clone());
    }

    fn next_run_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("scan_{}_{:03}", Utc::now().format("%Y%m%d_%H%M%S"), seq)
    }
}
