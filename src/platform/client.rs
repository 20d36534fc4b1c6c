//! HTTP plumbing shared by the bootstrap, API and relay paths

use crate::error::GatewayError;
use crate::platform::bootstrap::Credentials;
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Client surface presented to the private API
pub const WEB_CLIENT_NAME: &str = "WEB";

/// Numeric client identifier for the `X-YouTube-Client-Name` header
pub const WEB_CLIENT_ID: &str = "1";

/// Client version used when the bootstrap could not scrape one
pub const FALLBACK_CLIENT_VERSION: &str = "2.20240726.00.00";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Base URL of the platform website and API
    pub api_base: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: BROWSER_USER_AGENT.to_string(),
            api_base: "https://www.youtube.com".to_string(),
        }
    }
}

/// Shared HTTP client for platform traffic
#[derive(Clone)]
pub struct PlatformClient {
    client: Client,
    config: HttpConfig,
}

impl PlatformClient {
    /// Create a client with the default configuration
    pub fn new() -> Self {
        Self::with_config(HttpConfig::default())
    }

    /// Create a client with a custom configuration
    pub fn with_config(config: HttpConfig) -> Self {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, config }
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Base URL of the platform website and API
    pub fn api_base(&self) -> &str {
        &self.config.api_base
    }

    /// Create a GET request with browser-page headers, for scraping public HTML
    pub fn get_html(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
    }

    /// Create a GET request for CDN media with minimal headers.
    /// The media CDN answers 403 to browser-navigation headers.
    pub fn get_media(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("Accept", "*/*")
            .header("Accept-Encoding", "identity")
            .header("Connection", "keep-alive")
    }

    /// Create an authenticated POST to a private API endpoint.
    /// Fails when the credential snapshot carries no API key.
    pub fn innertube_post(
        &self,
        endpoint: &str,
        credentials: &Credentials,
        body: &Value,
    ) -> Result<reqwest::RequestBuilder, GatewayError> {
        let api_key = credentials
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Credential("API key missing from bootstrap".to_string()))?;

        let url = format!(
            "{}/youtubei/v1/{}?key={}&prettyPrint=false",
            self.config.api_base, endpoint, api_key
        );
        let client_version = credentials
            .client_version
            .as_deref()
            .unwrap_or(FALLBACK_CLIENT_VERSION);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-YouTube-Client-Name", WEB_CLIENT_ID)
            .header("X-YouTube-Client-Version", client_version);

        if let Some(visitor) = credentials.visitor_data.as_deref() {
            request = request.header("x-goog-visitor-id", visitor);
        }

        Ok(request.json(body))
    }

    /// Send a request and decode the JSON payload.
    /// Non-success statuses map to `UpstreamStatus`; retry policy belongs to the caller.
    pub async fn execute_json<T>(&self, request: reqwest::RequestBuilder) -> Result<T, GatewayError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            debug!("API request failed with status {}", status);
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl Default for PlatformClient {
    fn default() -> Self {
        Self::new()
    }
}
