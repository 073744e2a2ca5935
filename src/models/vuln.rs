use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Template-match severity levels in descending order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Parse an engine-reported severity; unrecognized values are treated
    /// as informational.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Info,
        }
    }
}

/// A single vulnerability-template match reported by the external engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    pub template_id: String,
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub references: Vec<String>,
    pub tags: Vec<String>,
    pub matched_at: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curl_command: Option<String>,
}

/// The vulnerability-scan section of a merged result. A failed or
/// unavailable engine produces an empty section with an error note rather
/// than failing the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnScanSection {
    pub target: String,
    pub findings: Vec<VulnerabilityFinding>,
    pub total: usize,
    pub severity_breakdown: BTreeMap<Severity, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl VulnScanSection {
    pub fn from_findings(target: &str, findings: Vec<VulnerabilityFinding>) -> Self {
        let mut severity_breakdown: BTreeMap<Severity, u32> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for finding in &findings {
            *severity_breakdown.entry(finding.severity).or_insert(0) += 1;
        }
        Self {
            target: target.to_string(),
            total: findings.len(),
            findings,
            severity_breakdown,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Empty section carrying a soft-failure note.
    pub fn degraded(target: &str, error: impl Into<String>) -> Self {
        let mut section = Self::from_findings(target, Vec::new());
        section.error = Some(error.into());
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_unknown_defaults_to_info() {
        assert_eq!(Severity::parse("critical"), Severity::Critical);
        assert_eq!(Severity::parse("HIGH"), Severity::High);
        assert_eq!(Severity::parse("unheard-of"), Severity::Info);
        assert_eq!(Severity::parse(""), Severity::Info);
    }

    #[test]
    fn test_breakdown_covers_all_levels() {
        let section = VulnScanSection::from_findings("example.com", Vec::new());
        assert_eq!(section.severity_breakdown.len(), 5);
        assert!(section
            .severity_breakdown
            .values()
            .all(|count| *count == 0));
    }

    #[test]
    fn test_degraded_section() {
        let section = VulnScanSection::degraded("example.com", "engine not available");
        assert!(section.findings.is_empty());
        assert_eq!(section.total, 0);
        assert_eq!(section.error.as_deref(), Some("engine not available"));
    }
}
