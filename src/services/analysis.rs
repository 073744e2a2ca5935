//! Rule-based synthesis of findings, recommendations and an overall
//! severity from merged scan data. Pure over its input; an inference
//! backend substituted later must preserve this signature.

use chrono::Utc;

use crate::models::{AnalysisResult, HostRecord, PortState, SeverityLabel};

/// Open services considered directly dangerous when exposed.
const DANGEROUS_SERVICES: &[&str] = &["ftp", "telnet", "snmp"];

const MAX_CRITICAL_FINDINGS: usize = 10;

pub fn analyze(hosts: &[HostRecord], analysis_type: &str) -> AnalysisResult {
    let total_risk: u32 = hosts.iter().map(|h| h.risk_score).sum();
    let avg_risk = f64::from(total_risk) / hosts.len().max(1) as f64;

    let mut critical_findings = Vec::new();
    for host in hosts {
        for port in &host.ports {
            if port.state == PortState::Open
                && DANGEROUS_SERVICES.contains(&port.service.as_str())
            {
                critical_findings.push(format!("{} on port {}", port.service, port.port));
            }
        }
    }
    critical_findings.truncate(MAX_CRITICAL_FINDINGS);

    let mut recommendations = Vec::new();
    if critical_findings.iter().any(|f| f.contains("ftp")) {
        recommendations.push("Disable FTP and use SFTP/SCP".to_string());
    }
    if critical_findings.iter().any(|f| f.contains("telnet")) {
        recommendations.push("Replace Telnet with SSH".to_string());
    }
    if critical_findings.iter().any(|f| f.contains("snmp")) {
        recommendations.push("Configure SNMPv3 or disable SNMP".to_string());
    }

    let severity = if avg_risk >= 8.0 {
        SeverityLabel::Critical
    } else if avg_risk >= 6.0 {
        SeverityLabel::High
    } else if avg_risk >= 3.0 {
        SeverityLabel::Medium
    } else {
        SeverityLabel::Low
    };

    let attack_vectors = if critical_findings.is_empty() {
        vec!["Low risk profile detected".to_string()]
    } else {
        vec![
            "Insecure services exposed".to_string(),
            "Possible service enumeration".to_string(),
            "Brute force vectors".to_string(),
        ]
    };

    AnalysisResult {
        risk_score: (avg_risk as u32).min(10) as u8,
        severity,
        critical_findings,
        recommendations,
        summary: format!(
            "Analysis completed for {} hosts. Average risk score: {:.1}",
            hosts.len(),
            avg_risk
        ),
        attack_vectors,
        analysis_type: analysis_type.to_string(),
        timestamp: Utc::now(),
    }
}
