//! Vulnerability-template engine adapter: runs nuclei as a child process
//! and parses its line-delimited JSON findings.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::process::Command;

use crate::models::{Severity, VulnScanSection, VulnerabilityFinding};

/// Seam for the external template engine. A scan never fails the run:
/// unavailability, timeouts and engine errors all degrade to an empty
/// section carrying an error note.
#[async_trait]
pub trait TemplateEngine: Send + Sync {
    async fn scan(&self, target: &str) -> VulnScanSection;
}

pub struct NucleiEngine {
    path: String,
    available: bool,
    global_timeout: Duration,
}

impl NucleiEngine {
    pub fn new(path: impl Into<String>, available: bool, global_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            available,
            global_timeout,
        }
    }
}

#[async_trait]
impl TemplateEngine for NucleiEngine {
    async fn scan(&self, target: &str) -> VulnScanSection {
        if !self.available {
            return VulnScanSection::degraded(target, "nuclei is not available");
        }

        let mut cmd = Command::new(&self.path);
        cmd.args(["-target", target])
            .args(["-jsonl", "-silent"])
            // Fixed safety arguments: rate limit, per-request timeout, retries
            .args(["-rate-limit", "50"])
            .args(["-timeout", "10"])
            .args(["-retries", "2"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            scan_target = target,
            timeout_secs = self.global_timeout.as_secs(),
            "starting vulnerability template scan"
        );

        let output = match tokio::time::timeout(self.global_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(scan_target = target, error = %e, "template engine failed to launch");
                return VulnScanSection::degraded(
                    target,
                    format!("failed to execute template engine: {e}"),
                );
            }
            Err(_) => {
                tracing::warn!(scan_target = target, "template scan hit global timeout");
                return VulnScanSection::degraded(
                    target,
                    format!(
                        "vulnerability scan timed out after {} seconds",
                        self.global_timeout.as_secs()
                    ),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let findings = parse_findings(&stdout);

        // A non-zero exit that still produced findings is kept; one that
        // produced nothing degrades the section with the engine's stderr.
        if !output.status.success() && findings.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                scan_target = target,
                exit_code = ?output.status.code(),
                "template engine exited with an error"
            );
            return VulnScanSection::degraded(
                target,
                format!(
                    "template engine exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            );
        }

        tracing::info!(
            scan_target = target,
            findings = findings.len(),
            "vulnerability template scan finished"
        );
        VulnScanSection::from_findings(target, findings)
    }
}

#[derive(Debug, Deserialize)]
struct EngineRecord {
    #[serde(rename = "template-id", default)]
    template_id: Option<String>,
    #[serde(default)]
    info: EngineRecordInfo,
    #[serde(rename = "matched-at", default)]
    matched_at: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(rename = "curl-command", default)]
    curl_command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EngineRecordInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    reference: Option<Vec<String>>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Parse newline-delimited JSON findings. Malformed lines are skipped,
/// never fatal.
pub(crate) fn parse_findings(output: &str) -> Vec<VulnerabilityFinding> {
    let mut findings = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<EngineRecord>(line) {
            Ok(record) => {
                findings.push(VulnerabilityFinding {
                    template_id: record.template_id.unwrap_or_else(|| "unknown".to_string()),
                    name: record.info.name.unwrap_or_else(|| "Unknown".to_string()),
                    severity: Severity::parse(record.info.severity.as_deref().unwrap_or("info")),
                    description: record.info.description.unwrap_or_default(),
                    references: record.info.reference.unwrap_or_default(),
                    tags: record.info.tags.unwrap_or_default(),
                    matched_at: record.matched_at.unwrap_or_default(),
                    timestamp: record
                        .timestamp
                        .unwrap_or_else(|| Utc::now().to_rfc3339()),
                    curl_command: record.curl_command,
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable finding line");
            }
        }
    }

    findings
}
