//! Upstream byte relay with bounded buffering
//!
//! Bytes move from the CDN to the caller in fixed-size chunks with at
//! most one chunk in flight. Dropping the body stream drops the upstream
//! response, which closes the connection instead of draining it.

use crate::error::GatewayError;
use crate::platform::client::PlatformClient;
use bytes::Bytes;
use futures::Stream;
use futures_util::TryStreamExt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, warn};

/// Chunk size of the relayed byte stream
pub const RELAY_CHUNK_SIZE: usize = 8 * 1024;

/// What kind of payload is being relayed; decides the content-type fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Media,
    Image,
}

impl RelayKind {
    /// Content type used when the upstream response carries none
    pub fn default_content_type(self) -> &'static str {
        match self {
            RelayKind::Media => "video/mp4",
            RelayKind::Image => "image/jpeg",
        }
    }
}

/// Cache directive attached to successfully relayed images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageCachePolicy {
    /// No cache directive
    #[default]
    None,
    /// `public, max-age=86400` for avatars and channel images
    PublicDay,
}

impl ImageCachePolicy {
    /// Header value for the policy, if any
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            ImageCachePolicy::None => None,
            ImageCachePolicy::PublicDay => Some("public, max-age=86400"),
        }
    }
}

/// Relayed upstream response
pub struct RelayedMedia {
    /// Upstream HTTP status
    pub status: u16,
    /// Content type, from the upstream header or the kind's default
    pub content_type: String,
    /// Cache directive to forward, if any
    pub cache_control: Option<&'static str>,
    pub body: RelayBody,
}

impl RelayedMedia {
    /// Check if the relay reached the streaming state
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, RelayBody::Streaming(_))
    }
}

/// Body of a relayed response
pub enum RelayBody {
    /// Short upstream error body, passed through verbatim
    Buffered(Bytes),
    /// Lazy, finite, non-restartable chunk sequence
    Streaming(RelayStream),
}

type UpstreamStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Chunked body stream. One chunk is produced per upstream read; the
/// producer suspends until the consumer takes it. A mid-stream I/O error
/// ends the sequence early with whatever was already delivered.
pub struct RelayStream {
    inner: UpstreamStream,
    done: bool,
}

impl RelayStream {
    fn new(inner: UpstreamStream) -> Self {
        Self { inner, done: false }
    }
}

impl Stream for RelayStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(chunk)),
            Poll::Ready(Some(Err(err))) => {
                warn!("Relay stream ended early: {}", err);
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Stateless relay of upstream media and image bytes
#[derive(Clone)]
pub struct MediaRelay {
    http: PlatformClient,
}

impl MediaRelay {
    /// Create a relay over a shared HTTP client
    pub fn new(http: PlatformClient) -> Self {
        Self { http }
    }

    /// Open the upstream URL and relay its response.
    /// A non-200 upstream answer is buffered and passed through with its
    /// status; a 200 answer becomes a chunked stream that never holds
    /// more than one chunk.
    pub async fn relay(
        &self,
        source_url: &str,
        kind: RelayKind,
    ) -> Result<RelayedMedia, GatewayError> {
        debug!("Opening upstream for relay: {}", source_url);
        let response = self.http.get_media(source_url).send().await?;
        let status = response.status();

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| kind.default_content_type().to_string());

        if status != reqwest::StatusCode::OK {
            debug!("Upstream answered {} for {}", status, source_url);
            let body = response.bytes().await?;
            return Ok(RelayedMedia {
                status: status.as_u16(),
                content_type,
                cache_control: None,
                body: RelayBody::Buffered(body),
            });
        }

        let reader = StreamReader::new(
            response
                .bytes_stream()
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err)),
        );
        let chunks = ReaderStream::with_capacity(reader, RELAY_CHUNK_SIZE);

        Ok(RelayedMedia {
            status: status.as_u16(),
            content_type,
            cache_control: None,
            body: RelayBody::Streaming(RelayStream::new(Box::pin(chunks))),
        })
    }

    /// Relay an image, attaching the requested cache directive on success
    pub async fn relay_image(
        &self,
        source_url: &str,
        cache: ImageCachePolicy,
    ) -> Result<RelayedMedia, GatewayError> {
        let mut relayed = self.relay(source_url, RelayKind::Image).await?;
        if relayed.is_streaming() {
            relayed.cache_control = cache.header_value();
        }
        Ok(relayed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::client::HttpConfig;
    use futures_util::StreamExt;

    fn relay_for(server: &mockito::Server) -> MediaRelay {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        MediaRelay::new(PlatformClient::with_config(HttpConfig {
            api_base: server.url(),
            ..Default::default()
        }))
    }

    async fn drain(stream: &mut RelayStream) -> (usize, usize, usize) {
        let mut total = 0;
        let mut chunks = 0;
        let mut largest = 0;
        while let Some(chunk) = stream.next().await {
            total += chunk.len();
            largest = largest.max(chunk.len());
            chunks += 1;
        }
        (total, chunks, largest)
    }

    #[tokio::test]
    async fn test_relay_404_stays_buffered() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.mp4")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let relayed = relay_for(&server)
            .relay(&format!("{}/missing.mp4", server.url()), RelayKind::Media)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(relayed.status, 404);
        assert!(!relayed.is_streaming());
        match relayed.body {
            RelayBody::Buffered(body) => assert_eq!(&body[..], b"Not Found"),
            RelayBody::Streaming(_) => panic!("404 must not stream"),
        }
    }

    #[tokio::test]
    async fn test_relay_streams_in_bounded_chunks() {
        let mut server = mockito::Server::new_async().await;
        // larger than any single chunk, not a multiple of the chunk size
        let payload = vec![0xABu8; 64 * 1024 + 123];
        let mock = server
            .mock("GET", "/large.mp4")
            .with_status(200)
            .with_header("content-type", "video/webm")
            .with_body(payload.clone())
            .create_async()
            .await;

        let relayed = relay_for(&server)
            .relay(&format!("{}/large.mp4", server.url()), RelayKind::Media)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(relayed.status, 200);
        assert_eq!(relayed.content_type, "video/webm");

        let RelayBody::Streaming(mut stream) = relayed.body else {
            panic!("200 must stream");
        };
        let (total, chunks, largest) = drain(&mut stream).await;
        assert_eq!(total, payload.len());
        assert!(chunks >= payload.len() / RELAY_CHUNK_SIZE);
        assert!(largest <= RELAY_CHUNK_SIZE);

        // finite and non-restartable: the drained stream stays empty
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_relay_media_content_type_default() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/typeless")
            .with_status(200)
            .with_body("data")
            .create_async()
            .await;

        let relayed = relay_for(&server)
            .relay(&format!("{}/typeless", server.url()), RelayKind::Media)
            .await
            .unwrap();
        assert_eq!(relayed.content_type, "video/mp4");
    }

    #[tokio::test]
    async fn test_relay_image_defaults_and_cache_directive() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/avatar")
            .with_status(200)
            .with_body(vec![1u8; 100])
            .create_async()
            .await;

        let relayed = relay_for(&server)
            .relay_image(
                &format!("{}/avatar", server.url()),
                ImageCachePolicy::PublicDay,
            )
            .await
            .unwrap();

        assert_eq!(relayed.content_type, "image/jpeg");
        assert_eq!(relayed.cache_control, Some("public, max-age=86400"));
    }

    #[tokio::test]
    async fn test_relay_image_failure_carries_no_cache_directive() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/gone.jpg")
            .with_status(410)
            .with_body("gone")
            .create_async()
            .await;

        let relayed = relay_for(&server)
            .relay_image(
                &format!("{}/gone.jpg", server.url()),
                ImageCachePolicy::PublicDay,
            )
            .await
            .unwrap();

        assert_eq!(relayed.status, 410);
        assert!(relayed.cache_control.is_none());
    }

    #[tokio::test]
    async fn test_relay_connection_failure_is_transport_error() {
        // nothing listens on this port
        let relay = MediaRelay::new(PlatformClient::new());
        let result = relay
            .relay("http://127.0.0.1:9/unreachable", RelayKind::Media)
            .await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[tokio::test]
    async fn test_relay_stream_error_ends_early() {
        use futures::stream;

        let inner: UpstreamStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"first")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"never delivered")),
        ]));
        let mut stream = RelayStream::new(inner);

        assert_eq!(stream.next().await.as_deref(), Some(b"first".as_ref()));
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_image_cache_policy_header() {
        assert_eq!(ImageCachePolicy::None.header_value(), None);
        assert_eq!(
            ImageCachePolicy::PublicDay.header_value(),
            Some("public, max-age=86400")
        );
    }

    #[test]
    fn test_relay_kind_defaults() {
        assert_eq!(RelayKind::Media.default_content_type(), "video/mp4");
        assert_eq!(RelayKind::Image.default_content_type(), "image/jpeg");
    }
}
