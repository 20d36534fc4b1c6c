//! # tubegate - gateway core for a private video API
//!
//! Browser-facing core of a gateway to a video platform's private
//! "InnerTube" API: credential bootstrap by HTML scraping, normalized
//! search/trending/channel/comment queries, playable-format resolution,
//! and a memory-bounded byte relay.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tubegate::{Gateway, StreamPreference};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::new();
//!
//!     let trending = gateway.resolve_trending(None, "US", 20).await?;
//!     println!("{} trending videos", trending.len());
//!
//!     let playback = gateway
//!         .resolve_playable("dQw4w9WgXcQ", StreamPreference::Highest)
//!         .await?;
//!     if let Some(stream) = &playback.stream {
//!         let relayed = gateway.relay_media(&stream.url).await?;
//!         println!("relaying as {}", relayed.content_type);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;
pub mod platform;
pub mod relay;
pub mod utils;

// Re-export main types
pub use crate::core::{
    ChannelMetadata, ChannelPage, CommentReply, CommentSort, CommentThread, FormatCandidate,
    Gateway, Playback, ResolvedStream, StreamPreference, TrendingCategory, VideoDescriptor,
};
pub use crate::error::GatewayError;
pub use crate::platform::{CredentialStore, Credentials, PlayerResponse, SeedSource, StreamResolver};
pub use crate::relay::{ImageCachePolicy, MediaRelay, RelayBody, RelayKind, RelayStream, RelayedMedia};

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
