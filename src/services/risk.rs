//! Pure risk-scoring functions over port and host records. No I/O.

use crate::models::{HostRecord, PortRecord, PortState};

/// Services whose exposure alone warrants a high base score.
const HIGH_RISK_SERVICES: &[&str] = &[
    "ftp",
    "telnet",
    "smtp",
    "snmp",
    "rpc",
    "netbios-ssn",
    "microsoft-ds",
];

const MEDIUM_RISK_SERVICES: &[&str] = &["ssh", "http", "https", "pop3", "imap", "ldap"];

/// Keywords in probe names or outputs that indicate a likely weakness.
const VULN_KEYWORDS: &[&str] = &["vuln", "exploit", "cve", "weak", "default", "anonymous"];

const MAX_PORT_SCORE: u32 = 10;

/// Score a single port in [0, 10].
///
/// Base score comes from the detected service; each probe entry whose name
/// or output matches a weakness keyword adds 5, stacking across entries.
/// The total is clamped to 10.
pub fn score_port(port: &PortRecord) -> u8 {
    let mut risk: u32 = 0;

    let service = port.service.to_ascii_lowercase();
    if HIGH_RISK_SERVICES.contains(&service.as_str()) {
        risk += 7;
    } else if MEDIUM_RISK_SERVICES.contains(&service.as_str()) {
        risk += 3;
    } else if port.state == PortState::Open {
        risk += 1;
    }

    for (name, output) in &port.scripts {
        let name = name.to_ascii_lowercase();
        let output = output.to_ascii_lowercase();
        if VULN_KEYWORDS
            .iter()
            .any(|kw| name.contains(kw) || output.contains(kw))
        {
            risk += 5;
        }
    }

    risk.min(MAX_PORT_SCORE) as u8
}

/// Sum of the host's current port scores. Not clamped: the host score is
/// an exposure aggregate, not a 0-10 scale.
pub fn score_host(host: &HostRecord) -> u32 {
    host.ports.iter().map(|p| p.risk_score as u32).sum()
}
