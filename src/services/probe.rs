//! Startup probe verifying that the external scan engines are callable.

use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;

use crate::config::Settings;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Capability map consumed by the orchestrator and status endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Capabilities {
    pub nmap: bool,
    pub nuclei: bool,
}

/// Probe both engines concurrently. Failures log a warning and mark the
/// tool unavailable; startup continues either way.
pub async fn detect(settings: &Settings) -> Capabilities {
    let (nmap, nuclei) = tokio::join!(
        check_tool("nmap", &settings.nmap_path, "--version"),
        check_tool("nuclei", &settings.nuclei_path, "-version"),
    );
    Capabilities { nmap, nuclei }
}

async fn check_tool(name: &str, path: &str, version_arg: &str) -> bool {
    let probe = Command::new(path)
        .arg(version_arg)
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(PROBE_TIMEOUT, probe).await {
        Ok(Ok(output)) if output.status.success() => {
            tracing::info!(tool = name, path = path, "scan engine available");
            true
        }
        Ok(Ok(output)) => {
            tracing::warn!(
                tool = name,
                path = path,
                exit_code = ?output.status.code(),
                "scan engine probe returned non-zero exit"
            );
            false
        }
        Ok(Err(e)) => {
            tracing::warn!(tool = name, path = path, error = %e, "scan engine not found");
            false
        }
        Err(_) => {
            tracing::warn!(tool = name, path = path, "scan engine probe timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_reports_unavailable() {
        assert!(!check_tool("nmap", "/nonexistent/nmap-binary", "--version").await);
    }

    #[tokio::test]
    async fn test_probe_never_panics_on_bad_path() {
        let mut settings = Settings::from_env(false).unwrap();
        settings.nmap_path = "/nonexistent/nmap-binary".to_string();
        settings.nuclei_path = "/nonexistent/nuclei-binary".to_string();
        let caps = detect(&settings).await;
        assert!(!caps.nmap);
        assert!(!caps.nuclei);
    }
}
