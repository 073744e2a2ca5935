pub mod abuseipdb;
pub mod throttled_client;
pub mod virustotal;

pub use abuseipdb::AbuseIpdbClient;
pub use throttled_client::ThrottledClient;
pub use virustotal::VirusTotalClient;

/// Provider-level failure. Never surfaced to API callers: a failed
/// provider is simply omitted from the verdict's sources.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// What one provider reported for an IP.
#[derive(Debug, Clone)]
pub enum ProviderSignal {
    Malicious(u32),
    Suspicious(u32),
    Clean,
}

/// Normalized single-provider result, merged into the aggregate verdict
/// by the reputation service.
#[derive(Debug, Clone)]
pub struct ProviderReport {
    pub source: &'static str,
    pub signal: ProviderSignal,
    pub threat_types: Vec<String>,
    pub detail: serde_json::Value,
}
