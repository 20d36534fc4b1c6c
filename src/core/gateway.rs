//! Facade the presentation layer drives
//!
//! Owns the credential store and one shared HTTP client; everything else
//! is stateless per request. Listing failures propagate with their
//! status, comment failures degrade to an empty result, and a persistent
//! auth failure invalidates the credential snapshot so the next request
//! re-bootstraps.

use crate::core::model::{
    ChannelPage, CommentSort, CommentThread, ResolvedStream, StreamPreference, TrendingCategory,
    VideoDescriptor,
};
use crate::error::GatewayError;
use crate::platform::bootstrap::{CredentialStore, SeedSource, WebSeedSource};
use crate::platform::client::PlatformClient;
use crate::platform::innertube::InnerTubeClient;
use crate::platform::player::{PlayerResponse, StreamResolver};
use crate::relay::media::{ImageCachePolicy, MediaRelay, RelayKind, RelayedMedia};
use std::sync::Arc;
use tracing::warn;

/// Result of a playback resolution: the raw player data plus the chosen
/// stream, if any. `stream: None` means the caller should surface the
/// derived refusal explanation.
#[derive(Debug)]
pub struct Playback {
    pub player: PlayerResponse,
    pub stream: Option<ResolvedStream>,
}

/// Browser-facing gateway core
pub struct Gateway {
    credentials: Arc<CredentialStore>,
    innertube: InnerTubeClient,
    resolver: StreamResolver,
    relay: MediaRelay,
}

impl Gateway {
    /// Create a gateway with the default HTTP configuration
    pub fn new() -> Self {
        Self::with_client(PlatformClient::new())
    }

    /// Create a gateway over a preconfigured HTTP client
    pub fn with_client(http: PlatformClient) -> Self {
        let source = Box::new(WebSeedSource::new(http.clone()));
        Self::with_seed_source(http, source)
    }

    /// Create a gateway with a custom credential seed source
    pub fn with_seed_source(http: PlatformClient, source: Box<dyn SeedSource>) -> Self {
        let credentials = Arc::new(CredentialStore::new(source));
        Self {
            innertube: InnerTubeClient::new(http.clone(), Arc::clone(&credentials)),
            resolver: StreamResolver::new(http.clone(), Arc::clone(&credentials)),
            relay: MediaRelay::new(http),
            credentials,
        }
    }

    /// Shared credential store, for warm-up or explicit invalidation
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Search videos in relevance order
    pub async fn resolve_search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<VideoDescriptor>, GatewayError> {
        self.noting_auth_failure(self.innertube.search(query, region, max_results).await)
            .await
    }

    /// Trending feed in platform order
    pub async fn resolve_trending(
        &self,
        category: Option<TrendingCategory>,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<VideoDescriptor>, GatewayError> {
        self.noting_auth_failure(self.innertube.trending(category, region, max_results).await)
            .await
    }

    /// Channel metadata plus uploads
    pub async fn resolve_channel(&self, channel_id: &str) -> Result<ChannelPage, GatewayError> {
        self.noting_auth_failure(self.innertube.browse(channel_id).await)
            .await
    }

    /// Comment threads for a video. Any failure degrades to an empty
    /// sequence at this boundary; listing and playback failures do not.
    pub async fn resolve_comments(
        &self,
        video_id: &str,
        max_results: usize,
        sort: CommentSort,
    ) -> Vec<CommentThread> {
        match self.innertube.comments(video_id, max_results, sort).await {
            Ok(threads) => threads,
            Err(err) => {
                warn!("Comment lookup for {} failed: {}", video_id, err);
                Vec::new()
            }
        }
    }

    /// Fetch player data and pick a stream under the preference.
    /// The chosen stream always comes from this fetch's candidate set.
    pub async fn resolve_playable(
        &self,
        video_id: &str,
        preference: StreamPreference,
    ) -> Result<Playback, GatewayError> {
        let player = self
            .noting_auth_failure(self.resolver.fetch_video_data(video_id).await)
            .await?;

        let candidates = StreamResolver::candidates(&player);
        let (chosen, size) = StreamResolver::select_format(&candidates, preference);
        let stream = chosen
            .and_then(|candidate| candidate.usable_url())
            .map(|url| ResolvedStream {
                url: url.to_string(),
                approx_size_bytes: size,
            });

        Ok(Playback { player, stream })
    }

    /// Refusal for a playback that resolved no stream, carrying the
    /// explanation derived from the playability status
    pub fn refusal(playback: &Playback) -> Option<GatewayError> {
        if playback.stream.is_some() {
            return None;
        }
        Some(GatewayError::NoPlayableFormat(
            StreamResolver::playability_explanation(&playback.player),
        ))
    }

    /// Relay media bytes from a CDN URL
    pub async fn relay_media(&self, url: &str) -> Result<RelayedMedia, GatewayError> {
        self.relay.relay(url, RelayKind::Media).await
    }

    /// Relay image bytes, optionally with a public cache directive
    pub async fn relay_image(
        &self,
        url: &str,
        cache: ImageCachePolicy,
    ) -> Result<RelayedMedia, GatewayError> {
        self.relay.relay_image(url, cache).await
    }

    /// Invalidate the credential snapshot when the upstream rejected it,
    /// so the next request re-bootstraps
    async fn noting_auth_failure<T>(
        &self,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        if let Err(err) = &result {
            if err.is_auth_failure() {
                warn!("Upstream rejected credentials: {}", err);
                self.credentials.invalidate().await;
            }
        }
        result
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}
