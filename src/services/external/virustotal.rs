use serde::Deserialize;
use serde_json::json;

use super::{ProviderError, ProviderReport, ProviderSignal, ThrottledClient};

const DEFAULT_BASE_URL: &str = "https://www.virustotal.com";

#[derive(Debug, Deserialize)]
struct VtResponse {
    data: VtData,
}

#[derive(Debug, Deserialize)]
struct VtData {
    #[serde(default)]
    attributes: VtAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct VtAttributes {
    #[serde(default)]
    last_analysis_stats: VtAnalysisStats,
}

#[derive(Debug, Default, Deserialize)]
struct VtAnalysisStats {
    #[serde(default)]
    harmless: u32,
    #[serde(default)]
    malicious: u32,
    #[serde(default)]
    suspicious: u32,
    #[serde(default)]
    undetected: u32,
}

/// VirusTotal IP reputation client. Free tier allows 4 requests per
/// minute, so the quota is kept at 1 request per second.
pub struct VirusTotalClient {
    client: ThrottledClient,
    api_key: String,
    base_url: String,
}

impl VirusTotalClient {
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
        let url = format!("{}/api/v3/ip_addresses/{}", self.base_url, ip);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-apikey",
            reqwest::header::HeaderValue::from_str(&self.api_key)
                .map_err(|e| ProviderError::Config(format!("invalid API key format: {e}")))?,
        );

        tracing::debug!(ip = ip, "querying VirusTotal");

        let response = self.client.get(&url, headers, &[]).await?;
        let body = response.text().await?;
        let report: VtResponse = serde_json::from_str(&body)?;

        let stats = report.data.attributes.last_analysis_stats;
        let (signal, threat_types) = if stats.malicious > 0 {
            (ProviderSignal::Malicious(8), vec!["malware".to_string()])
        } else if stats.suspicious > 0 {
            (ProviderSignal::Suspicious(5), Vec::new())
        } else {
            (ProviderSignal::Clean, Vec::new())
        };

        Ok(ProviderReport {
            source: "VirusTotal",
            signal,
            threat_types,
            detail: json!({
                "malicious": stats.malicious,
                "suspicious": stats.suspicious,
                "harmless": stats.harmless,
                "undetected": stats.undetected,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vt_body(malicious: u32, suspicious: u32) -> serde_json::Value {
        json!({
            "data": {
                "id": "10.0.0.5",
                "type": "ip_address",
                "attributes": {
                    "last_analysis_stats": {
                        "harmless": 60,
                        "malicious": malicious,
                        "suspicious": suspicious,
                        "undetected": 10,
                        "timeout": 0
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn test_malicious_ip_report() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/ip_addresses/10.0.0.5"))
            .and(header("x-apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vt_body(3, 0)))
            .mount(&mock_server)
            .await;

        let client =
            VirusTotalClient::with_base_url("test-key".to_string(), mock_server.uri()).unwrap();
        let report = client.check_ip("10.0.0.5").await.unwrap();

        assert!(matches!(report.signal, ProviderSignal::Malicious(8)));
        assert_eq!(report.threat_types, vec!["malware".to_string()]);
        assert_eq!(report.detail["malicious"], 3);
    }

    #[tokio::test]
    async fn test_suspicious_ip_report() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vt_body(0, 2)))
            .mount(&mock_server)
            .await;

        let client =
            VirusTotalClient::with_base_url("test-key".to_string(), mock_server.uri()).unwrap();
        let report = client.check_ip("10.0.0.5").await.unwrap();

        assert!(matches!(report.signal, ProviderSignal::Suspicious(5)));
        assert!(report.threat_types.is_empty());
    }

    #[tokio::test]
    async fn test_clean_ip_report() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vt_body(0, 0)))
            .mount(&mock_server)
            .await;

        let client =
            VirusTotalClient::with_base_url("test-key".to_string(), mock_server.uri()).unwrap();
        let report = client.check_ip("10.0.0.5").await.unwrap();

        assert!(matches!(report.signal, ProviderSignal::Clean));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let client =
            VirusTotalClient::with_base_url("bad-key".to_string(), mock_server.uri()).unwrap();
        assert!(client.check_ip("10.0.0.5").await.is_err());
    }
}
