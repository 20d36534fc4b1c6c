//! Domain objects produced by the gateway

use serde::{Deserialize, Serialize};

/// Read-only projection of a video entry in a listing response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// Platform video ID
    pub video_id: String,
    /// Video title
    pub title: String,
    /// Channel/author name
    pub author: String,
    /// Preformatted duration label (e.g., "12:34")
    pub duration_text: Option<String>,
    /// Thumbnail URLs, smallest first as the platform lists them
    pub thumbnail_urls: Vec<String>,
    /// Preformatted view-count label (e.g., "1.2M views")
    pub view_count_text: Option<String>,
}

/// Channel header fields from a browse response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Channel title
    pub title: String,
    /// Channel description
    pub description: String,
    /// Preformatted subscriber-count label
    pub subscriber_count_text: Option<String>,
    /// Avatar image URLs
    pub avatar_urls: Vec<String>,
}

/// Normalized channel browse result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPage {
    pub metadata: ChannelMetadata,
    /// Uploads in platform order
    pub videos: Vec<VideoDescriptor>,
}

/// A top-level comment with up to [`MAX_NESTED_REPLIES`] replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    pub author: String,
    pub text: String,
    pub replies: Vec<CommentReply>,
}

/// A nested reply under a comment thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentReply {
    pub author: String,
    pub text: String,
}

/// Replies carried per thread; deeper nesting is cut off
pub const MAX_NESTED_REPLIES: usize = 5;

/// Normalized entry from one player response's combined format arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatCandidate {
    /// Directly usable media URL; `None` for cipher-protected formats
    pub url: Option<String>,
    /// MIME type with codec parameters
    pub mime_type: String,
    /// Bitrate in bits per second
    pub bitrate: u64,
    /// Quality label (e.g., "720p")
    pub quality_label: Option<String>,
    /// Carries a video track
    pub has_video: bool,
    /// Carries an audio track
    pub has_audio: bool,
    /// Payload size in bytes, when the platform reports it
    pub content_length: Option<u64>,
}

impl FormatCandidate {
    /// Check if the candidate carries both audio and video
    pub fn is_combined(&self) -> bool {
        self.has_video && self.has_audio
    }

    /// Check if the candidate is audio-only
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Check if the candidate is video-only
    pub fn is_video_only(&self) -> bool {
        self.has_video && !self.has_audio
    }

    /// Directly usable URL, if the format exposes one
    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Playable stream chosen from a single fetch's candidate set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedStream {
    /// Direct media URL
    pub url: String,
    /// Approximate payload size, when known
    pub approx_size_bytes: Option<u64>,
}

/// Selection policy for picking one format out of a candidate set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPreference {
    /// Best combined stream, falling back to best single-track
    Highest,
    /// Smallest stream under the same combined-first policy
    Lowest,
    /// Audio track only
    AudioOnly,
    /// Video track only
    VideoOnly,
}

impl StreamPreference {
    /// Parse a preference from its query-parameter form
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "highest" => Ok(StreamPreference::Highest),
            "lowest" => Ok(StreamPreference::Lowest),
            "audio-only" => Ok(StreamPreference::AudioOnly),
            "video-only" => Ok(StreamPreference::VideoOnly),
            other => Err(format!("Unknown stream preference: {}", other)),
        }
    }
}

/// Comment ordering offered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    /// Platform-ranked comments
    #[default]
    Top,
    /// Newest first
    New,
}

impl CommentSort {
    /// Parse a sort order from its query-parameter form
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(CommentSort::Top),
            "new" => Ok(CommentSort::New),
            other => Err(format!("Unknown comment sort: {}", other)),
        }
    }

    /// Index into the platform's sort sub-menu
    pub fn menu_index(self) -> usize {
        match self {
            CommentSort::Top => 0,
            CommentSort::New => 1,
        }
    }
}

/// Trending feed category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendingCategory {
    Music,
    Gaming,
    Films,
}

impl TrendingCategory {
    /// Browse params token selecting the category tab
    pub fn params_token(self) -> &'static str {
        match self {
            TrendingCategory::Music => "4gINGgt5dG1hX2NoYXJ0cw%3D%3D",
            TrendingCategory::Gaming => "4gIcGhpnYW1pbmdfY29ycHVzX21vc3RfcG9wdWxhcg%3D%3D",
            TrendingCategory::Films => "4gIKGgh0cmFpbGVycw%3D%3D",
        }
    }

    /// Parse a category from its query-parameter form
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "music" => Ok(TrendingCategory::Music),
            "gaming" => Ok(TrendingCategory::Gaming),
            "films" | "movies" => Ok(TrendingCategory::Films),
            other => Err(format!("Unknown trending category: {}", other)),
        }
    }
}
