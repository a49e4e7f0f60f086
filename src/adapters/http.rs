use crate::domain::model::QueryPartition;
use crate::domain::ports::{ApiRequest, ApiResponse, Transport};
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;

pub const PREVIEW_URL: &str = "https://comtradeapi.un.org/public/v1/preview/C/A/HS";
pub const GET_URL: &str = "https://comtradeapi.un.org/public/v1/get/C/A/HS";
pub const API_KEY_ENV: &str = "COMTRADE_API_KEY";
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// reqwest 實作；Client 內含連線池，整個 run 共用一個
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.client.get(&request.url).query(&request.query);

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                HarvestError::ConfigError {
                    message: format!("invalid header name '{}': {}", name, e),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| HarvestError::ConfigError {
                message: format!("invalid value for header {}: {}", name, e),
            })?;
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(ApiResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointMode {
    Preview,
    Authenticated,
}

/// Comtrade v1 JSON endpoint, with the subscription key when authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub url: String,
    api_key: Option<String>,
}

impl ApiEndpoint {
    pub fn preview(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    /// 金鑰缺少時直接失敗，不進入重試
    pub fn authenticated(url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Ok(Self {
                url: url.into(),
                api_key: Some(key),
            }),
            None => Err(HarvestError::MissingCredential {
                env_var: API_KEY_ENV.to_string(),
                endpoint: "get".to_string(),
            }),
        }
    }

    pub fn resolve(mode: EndpointMode, preview_url: &str, get_url: &str) -> Result<Self> {
        match mode {
            EndpointMode::Preview => Ok(Self::preview(preview_url)),
            EndpointMode::Authenticated => {
                Self::authenticated(get_url, std::env::var(API_KEY_ENV).ok())
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn request(&self, partition: &QueryPartition) -> ApiRequest {
        let request = ApiRequest::get(self.url.clone())
            .with_query(partition.query_pairs())
            .with_header("Accept", "application/json");

        match &self.api_key {
            Some(key) => request.with_header(SUBSCRIPTION_KEY_HEADER, key),
            None => request,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn partition() -> QueryPartition {
        QueryPartition::for_years("56", "85", "M", "0", 2012, 2012).remove(0)
    }

    #[test]
    fn test_preview_request_shape() {
        let request = ApiEndpoint::preview(PREVIEW_URL).request(&partition());

        assert_eq!(request.url, PREVIEW_URL);
        assert_eq!(
            request.headers,
            vec![("Accept".to_string(), "application/json".to_string())]
        );
        assert!(request
            .query
            .contains(&("period".to_string(), "2012".to_string())));
    }

    #[test]
    fn test_authenticated_requires_key() {
        let err = ApiEndpoint::authenticated(GET_URL, None).unwrap_err();
        assert!(matches!(err, HarvestError::MissingCredential { .. }));

        let err = ApiEndpoint::authenticated(GET_URL, Some("  ".to_string())).unwrap_err();
        assert!(matches!(err, HarvestError::MissingCredential { .. }));
    }

    #[test]
    fn test_authenticated_sends_subscription_key() {
        let endpoint = ApiEndpoint::authenticated(GET_URL, Some("secret".to_string())).unwrap();
        let request = endpoint.request(&partition());

        assert!(endpoint.is_authenticated());
        assert!(request
            .headers
            .contains(&(SUBSCRIPTION_KEY_HEADER.to_string(), "secret".to_string())));
    }

    #[tokio::test]
    async fn test_transport_reports_status_and_retry_after() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/preview")
                .query_param("period", "2012")
                .query_param("reporterCode", "56")
                .header("Accept", "application/json");
            then.status(429).header("Retry-After", "7").body("slow down");
        });

        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let request = ApiEndpoint::preview(server.url("/preview")).request(&partition());
        let response = transport.get(&request).await.unwrap();

        api_mock.assert();
        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after.as_deref(), Some("7"));
        assert_eq!(response.body, "slow down");
    }
}
