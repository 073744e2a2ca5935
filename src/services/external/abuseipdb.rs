use serde::Deserialize;
use serde_json::json;

use super::{ProviderError, ProviderReport, ProviderSignal, ThrottledClient};

const DEFAULT_BASE_URL: &str = "https://api.abuseipdb.com";

#[derive(Debug, Deserialize)]
struct AbuseResponse {
    data: AbuseData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbuseData {
    #[serde(default)]
    abuse_confidence_percentage: u32,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    is_whitelisted: Option<bool>,
    #[serde(default)]
    total_reports: u32,
}

/// AbuseIPDB reputation client. Confidence above 75 counts as malicious,
/// above 25 as suspicious.
pub struct AbuseIpdbClient {
    client: ThrottledClient,
    api_key: String,
    base_url: String,
}

impl AbuseIpdbClient {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ThrottledClient::new(1)?,
            api_key,
            base_url,
        })
    }

    pub async fn check_ip(&self, ip: &str) -> Result<ProviderReport, ProviderError> {
        let url = format!("{}/api/v2/check", self.base_url);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Key",
            reqwest::header::HeaderValue::from_str(&self.api_key)
                .map_err(|e| ProviderError::Config(format!("invalid API key format: {e}")))?,
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        tracing::debug!(ip = ip, "querying AbuseIPDB");

        let response = self
            .client
            .get(
                &url,
                headers,
                &[("ipAddress", ip), ("maxAgeInDays", "90"), ("verbose", "")],
            )
            .await?;
        let body = response.text().await?;
        let report: AbuseResponse = serde_json::from_str(&body)?;

        let confidence = report.data.abuse_confidence_percentage;
        let signal = if confidence > 75 {
            ProviderSignal::Malicious(7)
        } else if confidence > 25 {
            ProviderSignal::Suspicious(4)
        } else {
            ProviderSignal::Clean
        };

        Ok(ProviderReport {
            source: "AbuseIPDB",
            signal,
            threat_types: Vec::new(),
            detail: json!({
                "abuse_confidence": confidence,
                "country_code": report.data.country_code.unwrap_or_default(),
                "is_whitelisted": report.data.is_whitelisted.unwrap_or(false),
                "total_reports": report.data.total_reports,
            }),
        })
    }
}
