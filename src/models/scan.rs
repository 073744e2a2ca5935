use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::analysis::AnalysisResult;
use crate::models::reputation::ReputationVerdict;
use crate::models::vuln::VulnScanSection;

/// Named discovery-engine preset mapping to an argument set and a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanProfile {
    Stealth,
    Aggressive,
    Vulnerability,
    Comprehensive,
    Quick,
}

impl ScanProfile {
    /// Resolve a caller-supplied profile name. Unrecognized names fall back
    /// to the aggressive preset.
    pub fn resolve(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "stealth" => Self::Stealth,
            "aggressive" => Self::Aggressive,
            "vulnerability" => Self::Vulnerability,
            "comprehensive" => Self::Comprehensive,
            "quick" => Self::Quick,
            _ => Self::Aggressive,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Stealth => "stealth",
            Self::Aggressive => "aggressive",
            Self::Vulnerability => "vulnerability",
            Self::Comprehensive => "comprehensive",
            Self::Quick => "quick",
        }
    }

    /// Engine argument set for this profile.
    pub fn engine_args(&self) -> &'static [&'static str] {
        match self {
            Self::Stealth => &["-sS", "-T2", "-f", "--min-rate", "10"],
            Self::Aggressive => &["-sS", "-sV", "-O", "-A", "-T4", "--min-rate", "1000"],
            Self::Vulnerability => &["-sV", "--script", "vuln,exploit", "-T3"],
            Self::Comprehensive => &[
                "-sS",
                "-sV",
                "-sC",
                "-O",
                "-A",
                "-T4",
                "--script",
                "vuln,exploit,discovery",
                "--min-rate",
                "500",
            ],
            Self::Quick => &["-sS", "-T4", "--top-ports", "1000"],
        }
    }

    /// Hard deadline for the discovery stage under this profile.
    pub fn timeout(&self) -> Duration {
        let secs = match self {
            Self::Stealth => 600,
            Self::Aggressive => 300,
            Self::Vulnerability => 450,
            Self::Comprehensive => 900,
            Self::Quick => 60,
        };
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One accepted scan request's lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRun {
    pub id: String,
    pub target: String,
    pub profile: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl ScanRun {
    pub fn new(id: String, target: String, profile: ScanProfile) -> Self {
        Self {
            id,
            target,
            profile: profile.name().to_string(),
            status: RunStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Filtered,
}

/// A single scanned port with its detected service and probe outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRecord {
    pub port: u16,
    pub protocol: Transport,
    pub state: PortState,
    pub service: String,
    pub product: String,
    pub version: String,
    pub extra_info: String,
    /// Probe name to verbatim probe output. The key set is open-ended.
    pub scripts: BTreeMap<String, String>,
    pub risk_score: u8,
}

impl PortRecord {
    pub fn new(port: u16, protocol: Transport, state: PortState) -> Self {
        Self {
            port,
            protocol,
            state,
            service: "unknown".to_string(),
            product: String::new(),
            version: String::new(),
            extra_info: String::new(),
            scripts: BTreeMap::new(),
            risk_score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    Up,
    Down,
    Unknown,
}

/// OS fingerprint candidate parsed best-effort from the discovery report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsMatch {
    pub name: String,
    pub accuracy: u8,
    pub platform: Option<String>,
}

/// A discovered host with its ports, OS candidates and enrichment data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub ip: String,
    pub hostname: Option<String>,
    pub state: HostState,
    pub ports: Vec<PortRecord>,
    pub os_matches: Vec<OsMatch>,
    /// Host-level probe name to verbatim output.
    pub scripts: BTreeMap<String, String>,
    /// Sum of port risk scores. Aggregates exposure, intentionally not
    /// bounded to the 0-10 per-port scale.
    pub risk_score: u32,
    pub reputation: Option<ReputationVerdict>,
}

impl HostRecord {
    pub fn new(ip: String) -> Self {
        Self {
            ip,
            hostname: None,
            state: HostState::Unknown,
            ports: Vec::new(),
            os_matches: Vec::new(),
            scripts: BTreeMap::new(),
            risk_score: 0,
            reputation: None,
        }
    }
}

/// Run-level counters over all discovered hosts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_hosts: usize,
    pub hosts_up: usize,
    pub total_ports: usize,
    pub open_ports: usize,
    pub services_detected: usize,
}

impl ScanSummary {
    pub fn compute(hosts: &[HostRecord]) -> Self {
        Self {
            total_hosts: hosts.len(),
            hosts_up: hosts.iter().filter(|h| h.state == HostState::Up).count(),
            total_ports: hosts.iter().map(|h| h.ports.len()).sum(),
            open_ports: hosts
                .iter()
                .flat_map(|h| &h.ports)
                .filter(|p| p.state == PortState::Open)
                .count(),
            services_detected: hosts
                .iter()
                .flat_map(|h| &h.ports)
                .filter(|p| p.service != "unknown")
                .count(),
        }
    }
}

/// The merged record for one run: discovery output plus optional
/// vulnerability-scan and analysis sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(flatten)]
    pub run: ScanRun,
    pub duration_seconds: f64,
    pub hosts: Vec<HostRecord>,
    pub summary: ScanSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerability_scan: Option<VulnScanSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

/// Request body for `POST /api/scan`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub target: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_true")]
    pub include_vulnerability_scan: bool,
    #[serde(default = "default_true")]
    pub include_analysis: bool,
}

fn default_profile() -> String {
    "aggressive".to_string()
}

fn default_true() -> bool {
    true
}
