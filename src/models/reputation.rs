use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Synthesized reputation judgment across providers. `malicious` overrides
/// `suspicious`, which overrides `clean`; `unknown` means no provider
/// contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationLabel {
    Malicious,
    Suspicious,
    Clean,
    Unknown,
}

/// Aggregated reputation verdict for one IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationVerdict {
    pub ip: String,
    pub reputation: ReputationLabel,
    /// Additive across providers, not averaged.
    pub risk_score: u32,
    pub threat_types: Vec<String>,
    pub sources: Vec<String>,
    pub details: BTreeMap<String, serde_json::Value>,
}

impl ReputationVerdict {
    pub fn unknown(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            reputation: ReputationLabel::Unknown,
            risk_score: 0,
            threat_types: Vec::new(),
            sources: Vec::new(),
            details: BTreeMap::new(),
        }
    }
}
