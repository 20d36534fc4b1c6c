//! URL helpers for video identifiers and upstream image endpoints

use crate::error::GatewayError;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Thumbnail host serving per-video preview images
const THUMBNAIL_BASE: &str = "https://i.ytimg.com";

/// Avatar/channel-image host
const AVATAR_BASE: &str = "https://yt3.googleusercontent.com";

static VIDEO_ID_RE: OnceLock<Regex> = OnceLock::new();

fn video_id_regex() -> &'static Regex {
    VIDEO_ID_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Failed to compile video ID regex")
    })
}

/// Extract a video ID from a raw identifier or any supported URL form
pub fn extract_video_id(input: &str) -> Result<String, GatewayError> {
    if video_id_regex().is_match(input) {
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input)?;
    match parsed.host_str().map(str::to_lowercase).as_deref() {
        Some("youtu.be") => {
            let path = parsed.path().trim_start_matches('/');
            if path.is_empty() {
                return Err(GatewayError::InvalidUrl("Missing video ID".to_string()));
            }
            Ok(path.to_string())
        }
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com") => {
            if parsed.path().starts_with("/watch") {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| GatewayError::InvalidUrl("Missing v parameter".to_string()))
            } else if let Some(id) = parsed
                .path()
                .strip_prefix("/shorts/")
                .or_else(|| parsed.path().strip_prefix("/embed/"))
            {
                if id.is_empty() {
                    return Err(GatewayError::InvalidUrl("Missing video ID".to_string()));
                }
                Ok(id.to_string())
            } else {
                Err(GatewayError::InvalidUrl(
                    "Unsupported video URL format".to_string(),
                ))
            }
        }
        _ => Err(GatewayError::InvalidUrl(
            "Not a supported video platform URL".to_string(),
        )),
    }
}

/// Thumbnail URL the image relay path serves for a video
pub fn thumbnail_url(video_id: &str) -> String {
    format!("{}/vi/{}/hqdefault.jpg", THUMBNAIL_BASE, video_id)
}

/// Join an avatar path fragment onto the image host.
/// The fragment comes from a client-controlled path, so anything that
/// escapes the host is rejected.
pub fn avatar_url(path: &str) -> Result<String, GatewayError> {
    let base = Url::parse(AVATAR_BASE)?;
    let joined = base.join(path)?;

    if joined.host_str() != base.host_str() || joined.scheme() != base.scheme() {
        return Err(GatewayError::InvalidUrl(
            "Avatar path escapes the image host".to_string(),
        ));
    }

    Ok(joined.to_string())
}
