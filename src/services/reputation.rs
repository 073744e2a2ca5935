//! Reputation enrichment: queries every configured provider for an IP and
//! synthesizes one verdict. A lookup never fails; providers that are
//! unconfigured, unreachable or slow are simply absent from `sources`.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Settings;
use crate::models::{ReputationLabel, ReputationVerdict};
use crate::services::external::{
    AbuseIpdbClient, ProviderReport, ProviderSignal, VirusTotalClient,
};

/// Seam for reputation lookup so the orchestrator can be exercised
/// against stubs.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> ReputationVerdict;
}

pub struct ReputationService {
    virustotal: Option<VirusTotalClient>,
    abuseipdb: Option<AbuseIpdbClient>,
    call_timeout: Duration,
}

impl ReputationService {
    pub fn new(settings: &Settings) -> Self {
        let virustotal = settings
            .virustotal_api_key
            .clone()
            .and_then(|key| match VirusTotalClient::new(key) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to configure VirusTotal client");
                    None
                }
            });

        let abuseipdb = settings
            .abuseipdb_api_key
            .clone()
            .and_then(|key| match AbuseIpdbClient::new(key) {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to configure AbuseIPDB client");
                    None
                }
            });

        Self::from_parts(
            virustotal,
            abuseipdb,
            Duration::from_secs_f64(settings.reputation_timeout_seconds),
        )
    }

    pub(crate) fn from_parts(
        virustotal: Option<VirusTotalClient>,
        abuseipdb: Option<AbuseIpdbClient>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            virustotal,
            abuseipdb,
            call_timeout,
        }
    }
}

#[async_trait]
impl ReputationLookup for ReputationService {
    async fn lookup(&self, ip: &str) -> ReputationVerdict {
        let call_timeout = self.call_timeout;

        let virustotal = async {
            match &self.virustotal {
                Some(client) => {
                    bounded_call("VirusTotal", ip, call_timeout, client.check_ip(ip)).await
                }
                None => None,
            }
        };
        let abuseipdb = async {
            match &self.abuseipdb {
                Some(client) => {
                    bounded_call("AbuseIPDB", ip, call_timeout, client.check_ip(ip)).await
                }
                None => None,
            }
        };

        let (vt_report, abuse_report) = tokio::join!(virustotal, abuseipdb);

        let mut verdict = ReputationVerdict::unknown(ip);
        for report in [vt_report, abuse_report].into_iter().flatten() {
            merge(&mut verdict, report);
        }
        verdict
    }
}

/// Deadline-bound one provider call; failures and timeouts degrade to None.
async fn bounded_call<F>(
    provider: &'static str,
    ip: &str,
    deadline: Duration,
    call: F,
) -> Option<ProviderReport>
where
    F: std::future::Future<Output = Result<ProviderReport, super::external::ProviderError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(report)) => Some(report),
        Ok(Err(e)) => {
            tracing::warn!(ip = ip, provider = provider, error = %e, "reputation lookup failed");
            None
        }
        Err(_) => {
            tracing::warn!(ip = ip, provider = provider, "reputation lookup timed out");
            None
        }
    }
}

/// Fold one provider report into the aggregate. Malicious overrides
/// suspicious, which overrides clean; weights are additive.
fn merge(verdict: &mut ReputationVerdict, report: ProviderReport) {
    match report.signal {
        ProviderSignal::Malicious(weight) => {
            verdict.reputation = ReputationLabel::Malicious;
            verdict.risk_score += weight;
        }
        ProviderSignal::Suspicious(weight) => {
            if verdict.reputation != ReputationLabel::Malicious {
                verdict.reputation = ReputationLabel::Suspicious;
            }
            verdict.risk_score += weight;
        }
        ProviderSignal::Clean => {
            if verdict.reputation == ReputationLabel::Unknown {
                verdict.reputation = ReputationLabel::Clean;
            }
        }
    }

    for threat_type in report.threat_types {
        if !verdict.threat_types.contains(&threat_type) {
            verdict.threat_types.push(threat_type);
        }
    }
    verdict
        .details
        .insert(report.source.to_ascii_lowercase(), report.detail);
    verdict.sources.push(report.source.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vt_body(malicious: u32, suspicious: u32) -> serde_json::Value {
        json!({
            "data": {
                "attributes": {
                    "last_analysis_stats": {
                        "harmless": 60,
                        "malicious": malicious,
                        "suspicious": suspicious,
                        "undetected": 10
                    }
                }
            }
        })
    }

    fn abuse_body(confidence: u32) -> serde_json::Value {
        json!({
            "data": {
                "abuseConfidencePercentage": confidence,
                "countryCode": "US",
                "isWhitelisted": false,
                "totalReports": 0
            }
        })
    }

    async fn service_with(
        vt_server: Option<&MockServer>,
        abuse_server: Option<&MockServer>,
        call_timeout: Duration,
    ) -> ReputationService {
        let virustotal = vt_server.map(|s| {
            VirusTotalClient::with_base_url("test-key".to_string(), s.uri()).unwrap()
        });
        let abuseipdb = abuse_server.map(|s| {
            AbuseIpdbClient::with_base_url("test-key".to_string(), s.uri()).unwrap()
        });
        ReputationService::from_parts(virustotal, abuseipdb, call_timeout)
    }

    #[tokio::test]
    async fn test_malicious_overrides_clean() {
        let vt_server = MockServer::start().await;
        let abuse_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/ip_addresses/10.0.0.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vt_body(3, 0)))
            .mount(&vt_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(abuse_body(0)))
            .mount(&abuse_server)
            .await;

        let service = service_with(
            Some(&vt_server),
            Some(&abuse_server),
            Duration::from_secs(10),
        )
        .await;
        let verdict = service.lookup("10.0.0.5").await;

        assert_eq!(verdict.reputation, ReputationLabel::Malicious);
        assert_eq!(verdict.risk_score, 8);
        assert_eq!(verdict.sources.len(), 2);
        assert!(verdict.sources.contains(&"VirusTotal".to_string()));
        assert!(verdict.sources.contains(&"AbuseIPDB".to_string()));
        assert!(verdict.details.contains_key("virustotal"));
        assert!(verdict.details.contains_key("abuseipdb"));
        assert_eq!(verdict.threat_types, vec!["malware".to_string()]);
    }

    #[tokio::test]
    async fn test_weights_are_additive() {
        let vt_server = MockServer::start().await;
        let abuse_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vt_body(1, 0)))
            .mount(&vt_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(abuse_body(90)))
            .mount(&abuse_server)
            .await;

        let service = service_with(
            Some(&vt_server),
            Some(&abuse_server),
            Duration::from_secs(10),
        )
        .await;
        let verdict = service.lookup("10.0.0.5").await;

        assert_eq!(verdict.reputation, ReputationLabel::Malicious);
        assert_eq!(verdict.risk_score, 15);
    }

    #[tokio::test]
    async fn test_no_providers_yields_unknown() {
        let service = service_with(None, None, Duration::from_secs(10)).await;
        let verdict = service.lookup("10.0.0.5").await;

        assert_eq!(verdict.reputation, ReputationLabel::Unknown);
        assert_eq!(verdict.risk_score, 0);
        assert!(verdict.sources.is_empty());
        assert!(verdict.details.is_empty());
    }

    #[tokio::test]
    async fn test_failing_provider_is_omitted() {
        let vt_server = MockServer::start().await;
        let abuse_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&vt_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(abuse_body(0)))
            .mount(&abuse_server)
            .await;

        let service = service_with(
            Some(&vt_server),
            Some(&abuse_server),
            Duration::from_secs(10),
        )
        .await;
        let verdict = service.lookup("10.0.0.5").await;

        assert_eq!(verdict.reputation, ReputationLabel::Clean);
        assert_eq!(verdict.sources, vec!["AbuseIPDB".to_string()]);
    }

    #[tokio::test]
    async fn test_slow_provider_is_omitted() {
        let vt_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(vt_body(3, 0))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&vt_server)
            .await;

        let service = service_with(Some(&vt_server), None, Duration::from_millis(100)).await;
        let verdict = service.lookup("10.0.0.5").await;

        assert_eq!(verdict.reputation, ReputationLabel::Unknown);
        assert!(verdict.sources.is_empty());
    }

    #[tokio::test]
    async fn test_suspicious_does_not_downgrade_malicious() {
        let mut verdict = ReputationVerdict::unknown("10.0.0.5");
        merge(
            &mut verdict,
            ProviderReport {
                source: "VirusTotal",
                signal: ProviderSignal::Malicious(8),
                threat_types: vec!["malware".to_string()],
                detail: json!({}),
            },
        );
        merge(
            &mut verdict,
            ProviderReport {
                source: "AbuseIPDB",
                signal: ProviderSignal::Suspicious(4),
                threat_types: Vec::new(),
                detail: json!({}),
            },
        );

        assert_eq!(verdict.reputation, ReputationLabel::Malicious);
        assert_eq!(verdict.risk_score, 12);
    }
}
