use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};

use super::ProviderError;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Quota-throttled HTTP client for reputation provider APIs.
pub struct ThrottledClient {
    client: Client,
    limiter: Arc<DirectLimiter>,
}

impl ThrottledClient {
    pub fn new(requests_per_second: u32) -> Result<Self, ProviderError> {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).ok_or_else(|| {
            ProviderError::Config("requests_per_second must be greater than 0".to_string())
        })?);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("gungnir/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Quota-gated GET. The caller owns retry and deadline policy; a
    /// per-lookup deadline wraps this call in the reputation service.
    pub async fn get(
        &self,
        url: &str,
        headers: HeaderMap,
        query: &[(&str, &str)],
    ) -> Result<Response, ProviderError> {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_successful_get() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        let client = ThrottledClient::new(10).unwrap();
        let response = client
            .get(&mock_server.uri(), HeaderMap::new(), &[])
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let client = ThrottledClient::new(10).unwrap();
        let result = client.get(&mock_server.uri(), HeaderMap::new(), &[]).await;
        assert!(matches!(result, Err(ProviderError::Status(_))));
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            ThrottledClient::new(0),
            Err(ProviderError::Config(_))
        ));
    }
}
