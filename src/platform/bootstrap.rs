//! Credential scraping from public platform HTML
//!
//! The private API wants an API key, a client version and a visitor token
//! that the platform embeds in its public pages. All three are scraped
//! with independent patterns; a field the markup no longer carries comes
//! back as `None` so callers can decide whether a partial snapshot is
//! usable. The scraped snapshot is cached process-wide and only refreshed
//! after an explicit invalidation.

use crate::error::GatewayError;
use crate::platform::client::PlatformClient;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

static API_KEY_RE: OnceLock<Regex> = OnceLock::new();
static CLIENT_VERSION_RE: OnceLock<Regex> = OnceLock::new();
static VISITOR_DATA_RE: OnceLock<Regex> = OnceLock::new();

fn api_key_regex() -> &'static Regex {
    API_KEY_RE.get_or_init(|| {
        Regex::new(r#"["']INNERTUBE_API_KEY["']\s*:\s*["']([^"']+)["']"#)
            .expect("Failed to compile API key regex")
    })
}

fn client_version_regex() -> &'static Regex {
    CLIENT_VERSION_RE.get_or_init(|| {
        Regex::new(r#"["']INNERTUBE_CONTEXT_CLIENT_VERSION["']\s*:\s*["']([^"']+)["']"#)
            .expect("Failed to compile client version regex")
    })
}

fn visitor_data_regex() -> &'static Regex {
    VISITOR_DATA_RE.get_or_init(|| {
        Regex::new(r#"["']VISITOR_DATA["']\s*:\s*["']([^"']+)["']"#)
            .expect("Failed to compile visitor data regex")
    })
}

/// Immutable credential snapshot scraped from platform HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API key passed as the `key` query parameter
    pub api_key: Option<String>,
    /// Client version echoed in request contexts and headers
    pub client_version: Option<String>,
    /// Visitor token for the `x-goog-visitor-id` header
    pub visitor_data: Option<String>,
}

impl Credentials {
    /// Check if all three fields were scraped
    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.client_version.is_some() && self.visitor_data.is_some()
    }
}

/// Extract credentials from platform HTML.
/// Each field is matched independently; a miss yields `None` for that
/// field only, never a failure.
pub fn extract(html: &str) -> Credentials {
    let capture = |re: &Regex| {
        re.captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    Credentials {
        api_key: capture(api_key_regex()),
        client_version: capture(client_version_regex()),
        visitor_data: capture(visitor_data_regex()),
    }
}

/// Source of the HTML page the credentials are scraped from.
/// The markup is brittle; keeping the fetch behind a trait lets the
/// scraping strategy be swapped without touching the store.
#[async_trait]
pub trait SeedSource: Send + Sync {
    /// Fetch the seed page, failing on connection errors and non-2xx
    async fn fetch_seed_html(&self) -> Result<String, GatewayError>;
}

/// Default seed source: the platform front page
pub struct WebSeedSource {
    http: PlatformClient,
    seed_url: String,
}

impl WebSeedSource {
    /// Seed from the front page of the client's configured base URL
    pub fn new(http: PlatformClient) -> Self {
        let seed_url = format!("{}/", http.api_base());
        Self { http, seed_url }
    }

    /// Seed from a specific page
    pub fn with_url(http: PlatformClient, seed_url: impl Into<String>) -> Self {
        Self {
            http,
            seed_url: seed_url.into(),
        }
    }
}

#[async_trait]
impl SeedSource for WebSeedSource {
    async fn fetch_seed_html(&self) -> Result<String, GatewayError> {
        debug!("Fetching credential seed page: {}", self.seed_url);
        let response = self.http.get_html(&self.seed_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Credential(format!(
                "seed page returned status {}",
                status
            )));
        }

        Ok(response.text().await?)
    }
}

/// Process-wide credential cache with a defined lifecycle: lazy
/// single-flight initialization, `Arc` snapshot reads, manual
/// invalidation after a persistent auth failure.
pub struct CredentialStore {
    source: Box<dyn SeedSource>,
    slot: RwLock<Option<Arc<Credentials>>>,
}

impl CredentialStore {
    /// Create an empty store over a seed source
    pub fn new(source: Box<dyn SeedSource>) -> Self {
        Self {
            source,
            slot: RwLock::new(None),
        }
    }

    /// Get the cached snapshot, bootstrapping it on first use.
    /// Concurrent cold callers coalesce into a single upstream scrape:
    /// whoever wins the write lock fetches, everyone else re-checks and
    /// reuses the stored snapshot.
    pub async fn get(&self) -> Result<Arc<Credentials>, GatewayError> {
        if let Some(credentials) = self.slot.read().await.as_ref() {
            return Ok(Arc::clone(credentials));
        }

        let mut slot = self.slot.write().await;
        if let Some(credentials) = slot.as_ref() {
            return Ok(Arc::clone(credentials));
        }

        let html = self.source.fetch_seed_html().await?;
        let credentials = Arc::new(extract(&html));

        if credentials.is_complete() {
            info!("Credential bootstrap complete");
        } else {
            warn!(
                "Credential bootstrap partial (api_key: {}, client_version: {}, visitor_data: {})",
                credentials.api_key.is_some(),
                credentials.client_version.is_some(),
                credentials.visitor_data.is_some()
            );
        }

        *slot = Some(Arc::clone(&credentials));
        Ok(credentials)
    }

    /// Drop the snapshot so the next `get()` re-bootstraps
    pub async fn invalidate(&self) {
        warn!("Invalidating credential snapshot");
        *self.slot.write().await = None;
    }

    /// Peek at the snapshot without triggering a bootstrap
    pub async fn snapshot(&self) -> Option<Arc<Credentials>> {
        self.slot.read().await.clone()
    }
}
