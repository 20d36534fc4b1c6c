//! Per-video player data and playable format selection

use crate::core::model::{FormatCandidate, StreamPreference};
use crate::error::GatewayError;
use crate::platform::bootstrap::CredentialStore;
use crate::platform::client::{PlatformClient, FALLBACK_CLIENT_VERSION, WEB_CLIENT_NAME};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Raw player response for one video, never persisted
#[derive(Debug, Deserialize)]
pub struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    pub playability_status: Option<PlayabilityStatus>,
    #[serde(rename = "videoDetails")]
    pub video_details: Option<VideoDetails>,
    #[serde(rename = "streamingData")]
    pub streaming_data: Option<StreamingData>,
}

/// Platform verdict on whether the video may play in this context
#[derive(Debug, Deserialize)]
pub struct PlayabilityStatus {
    pub status: Option<String>,
    pub reason: Option<String>,
    #[serde(rename = "errorScreen")]
    pub error_screen: Option<ErrorScreen>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorScreen {
    #[serde(rename = "playerErrorMessageRenderer")]
    pub player_error_message_renderer: Option<PlayerErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerErrorMessage {
    pub subreason: Option<TextRuns>,
}

/// Label node carrying either preformatted text or text runs
#[derive(Debug, Deserialize)]
pub struct TextRuns {
    pub runs: Option<Vec<TextRun>>,
    #[serde(rename = "simpleText")]
    pub simple_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextRun {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct VideoDetails {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "lengthSeconds")]
    pub length_seconds: Option<String>,
    #[serde(rename = "shortDescription")]
    pub short_description: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub thumbnails: Vec<ThumbnailInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailInfo {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StreamingData {
    pub formats: Option<Vec<RawFormat>>,
    #[serde(rename = "adaptiveFormats")]
    pub adaptive_formats: Option<Vec<RawFormat>>,
}

/// One entry of the platform's format arrays, as delivered
#[derive(Debug, Deserialize)]
pub struct RawFormat {
    pub url: Option<String>,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub bitrate: Option<u64>,
    #[serde(rename = "qualityLabel")]
    pub quality_label: Option<String>,
    #[serde(rename = "contentLength")]
    pub content_length: Option<String>,
    #[serde(rename = "audioQuality")]
    pub audio_quality: Option<String>,
    #[serde(rename = "audioChannels")]
    pub audio_channels: Option<u32>,
    #[serde(rename = "signatureCipher")]
    pub signature_cipher: Option<String>,
}

impl RawFormat {
    fn to_candidate(&self) -> FormatCandidate {
        let mime_type = self.mime_type.clone().unwrap_or_default();
        let has_video = mime_type.starts_with("video/");
        let has_audio = mime_type.starts_with("audio/")
            || self.audio_quality.is_some()
            || self.audio_channels.is_some();

        FormatCandidate {
            url: self.url.clone(),
            mime_type,
            bitrate: self.bitrate.unwrap_or(0),
            quality_label: self.quality_label.clone(),
            has_video,
            has_audio,
            content_length: self
                .content_length
                .as_deref()
                .and_then(|length| length.parse().ok()),
        }
    }
}

/// Resolves a video into player data and a playable stream choice
pub struct StreamResolver {
    http: PlatformClient,
    credentials: Arc<CredentialStore>,
}

impl StreamResolver {
    /// Create a resolver over a shared HTTP client and credential store
    pub fn new(http: PlatformClient, credentials: Arc<CredentialStore>) -> Self {
        Self { http, credentials }
    }

    /// Fetch player data for one video.
    /// The playability verdict is part of the response, not an error;
    /// callers need the reason text to explain refusals.
    pub async fn fetch_video_data(&self, video_id: &str) -> Result<PlayerResponse, GatewayError> {
        debug!("Fetching player data for video {}", video_id);
        let credentials = self.credentials.get().await?;

        let payload = json!({
            "context": { "client": {
                "clientName": WEB_CLIENT_NAME,
                "clientVersion": credentials
                    .client_version
                    .as_deref()
                    .unwrap_or(FALLBACK_CLIENT_VERSION),
                "hl": "en",
            }},
            "videoId": video_id,
        });

        let request = self.http.innertube_post("player", &credentials, &payload)?;
        self.http.execute_json(request).await
    }

    /// Normalize the combined format arrays of one player response.
    /// Progressive formats come first, then adaptive ones, matching the
    /// order the platform reports them in.
    pub fn candidates(response: &PlayerResponse) -> Vec<FormatCandidate> {
        let Some(streaming_data) = &response.streaming_data else {
            return Vec::new();
        };

        streaming_data
            .formats
            .iter()
            .flatten()
            .chain(streaming_data.adaptive_formats.iter().flatten())
            .map(RawFormat::to_candidate)
            .collect()
    }

    /// Pick one candidate under the given preference.
    /// Only candidates exposing a directly usable URL are eligible;
    /// cipher-protected entries never qualify. Returns `(None, None)`
    /// when nothing is eligible.
    pub fn select_format<'a>(
        candidates: &'a [FormatCandidate],
        preference: StreamPreference,
    ) -> (Option<&'a FormatCandidate>, Option<u64>) {
        let usable: Vec<&FormatCandidate> = candidates
            .iter()
            .filter(|candidate| candidate.usable_url().is_some())
            .collect();
        if usable.is_empty() {
            return (None, None);
        }

        let chosen = match preference {
            StreamPreference::Highest => rank_combined_first(usable, false),
            StreamPreference::Lowest => rank_combined_first(usable, true),
            StreamPreference::AudioOnly => usable
                .into_iter()
                .filter(|candidate| candidate.is_audio_only())
                .max_by_key(|candidate| candidate.bitrate),
            StreamPreference::VideoOnly => usable
                .into_iter()
                .filter(|candidate| candidate.is_video_only())
                .max_by_key(|candidate| candidate.bitrate),
        };

        let size = chosen.and_then(|candidate| candidate.content_length);
        (chosen, size)
    }

    /// User-facing explanation for a refused playback, derived from the
    /// playability status: the reason, then the error-screen subreason
    /// runs joined with single spaces after a colon.
    pub fn playability_explanation(response: &PlayerResponse) -> String {
        let reason = response
            .playability_status
            .as_ref()
            .and_then(|status| status.reason.clone())
            .unwrap_or_else(|| "No stream found".to_string());

        let subreason = response
            .playability_status
            .as_ref()
            .and_then(|status| status.error_screen.as_ref())
            .and_then(|screen| screen.player_error_message_renderer.as_ref())
            .and_then(|message| message.subreason.as_ref())
            .and_then(|subreason| match (&subreason.runs, &subreason.simple_text) {
                (Some(runs), _) if !runs.is_empty() => Some(
                    runs.iter()
                        .map(|run| run.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
                (_, Some(simple)) => Some(simple.clone()),
                _ => None,
            });

        match subreason {
            Some(subreason) if !subreason.is_empty() => format!("{}: {}", reason, subreason),
            _ => reason,
        }
    }
}

/// Rank with combined audio+video candidates taking precedence whenever
/// any exists; survivors ordered by bitrate with content length as the
/// tie-break, first-seen order on a full tie.
fn rank_combined_first<'a>(
    usable: Vec<&'a FormatCandidate>,
    ascending: bool,
) -> Option<&'a FormatCandidate> {
    let mut pool: Vec<&FormatCandidate> = if usable.iter().any(|c| c.is_combined()) {
        usable.into_iter().filter(|c| c.is_combined()).collect()
    } else {
        usable
    };

    pool.sort_by(|a, b| {
        let ordering = a
            .bitrate
            .cmp(&b.bitrate)
            .then(a.content_length.unwrap_or(0).cmp(&b.content_length.unwrap_or(0)));
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });

    pool.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::bootstrap::SeedSource;
    use crate::platform::client::HttpConfig;
    use async_trait::async_trait;
    use serde_json::Value;

    fn candidate(
        url: Option<&str>,
        mime: &str,
        bitrate: u64,
        audio: bool,
        length: Option<u64>,
    ) -> FormatCandidate {
        FormatCandidate {
            url: url.map(str::to_string),
            mime_type: mime.to_string(),
            bitrate,
            quality_label: None,
            has_video: mime.starts_with("video/"),
            has_audio: audio || mime.starts_with("audio/"),
            content_length: length,
        }
    }

    #[test]
    fn test_select_highest_prefers_combined() {
        let candidates = vec![
            candidate(Some("a"), "video/mp4", 5_000_000, false, None), // video-only
            candidate(Some("b"), "video/mp4", 1_000_000, true, None),  // combined
            candidate(Some("c"), "audio/mp4", 128_000, true, None),    // audio-only
        ];

        let (chosen, _) =
            StreamResolver::select_format(&candidates, StreamPreference::Highest);
        let chosen = chosen.unwrap();
        assert!(chosen.is_combined());
        assert_eq!(chosen.url.as_deref(), Some("b"));
    }

    #[test]
    fn test_select_highest_ranks_by_bitrate_then_length() {
        let candidates = vec![
            candidate(Some("small"), "video/mp4", 2_000_000, true, Some(10)),
            candidate(Some("large"), "video/mp4", 2_000_000, true, Some(99)),
            candidate(Some("slow"), "video/mp4", 1_000_000, true, Some(500)),
        ];

        let (chosen, size) =
            StreamResolver::select_format(&candidates, StreamPreference::Highest);
        assert_eq!(chosen.unwrap().url.as_deref(), Some("large"));
        assert_eq!(size, Some(99));
    }

    #[test]
    fn test_select_highest_falls_back_without_combined() {
        let candidates = vec![
            candidate(Some("v"), "video/mp4", 3_000_000, false, None),
            candidate(Some("a"), "audio/webm", 160_000, true, None),
        ];

        let (chosen, _) =
            StreamResolver::select_format(&candidates, StreamPreference::Highest);
        assert_eq!(chosen.unwrap().url.as_deref(), Some("v"));
    }

    #[test]
    fn test_select_lowest_picks_smallest_combined() {
        let candidates = vec![
            candidate(Some("hi"), "video/mp4", 4_000_000, true, None),
            candidate(Some("lo"), "video/mp4", 500_000, true, None),
            candidate(Some("tiny-audio"), "audio/mp4", 48_000, true, None),
        ];

        let (chosen, _) = StreamResolver::select_format(&candidates, StreamPreference::Lowest);
        assert_eq!(chosen.unwrap().url.as_deref(), Some("lo"));
    }

    #[test]
    fn test_select_audio_only_and_video_only() {
        let candidates = vec![
            candidate(Some("combined"), "video/mp4", 2_000_000, true, None),
            candidate(Some("best-audio"), "audio/webm", 160_000, false, None),
            candidate(Some("worse-audio"), "audio/mp4", 128_000, false, None),
            candidate(Some("best-video"), "video/webm", 5_000_000, false, None),
        ];

        let (audio, _) =
            StreamResolver::select_format(&candidates, StreamPreference::AudioOnly);
        assert_eq!(audio.unwrap().url.as_deref(), Some("best-audio"));

        let (video, _) =
            StreamResolver::select_format(&candidates, StreamPreference::VideoOnly);
        assert_eq!(video.unwrap().url.as_deref(), Some("best-video"));
    }

    #[test]
    fn test_select_from_empty_set() {
        assert!(matches!(
            StreamResolver::select_format(&[], StreamPreference::Highest),
            (None, None)
        ));
        assert!(matches!(
            StreamResolver::select_format(&[], StreamPreference::AudioOnly),
            (None, None)
        ));
    }

    #[test]
    fn test_select_ignores_candidates_without_url() {
        let candidates = vec![
            candidate(None, "video/mp4", 9_000_000, true, None),
            candidate(Some(""), "video/mp4", 8_000_000, true, None),
        ];

        assert!(matches!(
            StreamResolver::select_format(&candidates, StreamPreference::Highest),
            (None, None)
        ));
    }

    fn player_response(body: Value) -> PlayerResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_candidates_keep_array_order_and_parse_lengths() {
        let response = player_response(json!({
            "streamingData": {
                "formats": [
                    { "url": "p1", "mimeType": "video/mp4; codecs=\"avc1, mp4a\"",
                      "bitrate": 1_500_000, "qualityLabel": "720p",
                      "audioQuality": "AUDIO_QUALITY_MEDIUM", "contentLength": "123456" }
                ],
                "adaptiveFormats": [
                    { "url": "a1", "mimeType": "video/webm; codecs=\"vp9\"", "bitrate": 4_000_000 },
                    { "mimeType": "audio/webm; codecs=\"opus\"", "bitrate": 160_000,
                      "signatureCipher": "s=abc&url=def" }
                ]
            }
        }));

        let candidates = StreamResolver::candidates(&response);
        assert_eq!(candidates.len(), 3);
        assert!(candidates[0].is_combined());
        assert_eq!(candidates[0].content_length, Some(123_456));
        assert!(candidates[1].is_video_only());
        assert!(candidates[2].is_audio_only());
        assert!(candidates[2].usable_url().is_none());
    }

    #[test]
    fn test_candidates_without_streaming_data() {
        let response = player_response(json!({ "playabilityStatus": { "status": "ERROR" } }));
        assert!(StreamResolver::candidates(&response).is_empty());
    }

    #[test]
    fn test_playability_explanation_joins_subreason_runs() {
        let response = player_response(json!({
            "playabilityStatus": {
                "status": "UNPLAYABLE",
                "reason": "Video unavailable",
                "errorScreen": { "playerErrorMessageRenderer": { "subreason": { "runs": [
                    { "text": "The uploader has not made this video available" },
                    { "text": "in your country" }
                ]}}}
            }
        }));

        assert_eq!(
            StreamResolver::playability_explanation(&response),
            "Video unavailable: The uploader has not made this video available in your country"
        );
    }

    #[test]
    fn test_playability_explanation_reason_only() {
        let response = player_response(json!({
            "playabilityStatus": { "status": "LOGIN_REQUIRED", "reason": "Sign in to confirm your age" }
        }));
        assert_eq!(
            StreamResolver::playability_explanation(&response),
            "Sign in to confirm your age"
        );
    }

    #[test]
    fn test_playability_explanation_fallback() {
        let response = player_response(json!({}));
        assert_eq!(
            StreamResolver::playability_explanation(&response),
            "No stream found"
        );
    }

    #[test]
    fn test_region_blocked_response_has_no_selection() {
        let response = player_response(json!({
            "playabilityStatus": {
                "status": "UNPLAYABLE",
                "reason": "The uploader has not made this video available in your country"
            }
        }));

        let candidates = StreamResolver::candidates(&response);
        assert!(matches!(
            StreamResolver::select_format(&candidates, StreamPreference::Highest),
            (None, None)
        ));
        assert!(response
            .playability_status
            .as_ref()
            .and_then(|s| s.reason.as_ref())
            .is_some());
    }

    struct StaticSeed;

    #[async_trait]
    impl SeedSource for StaticSeed {
        async fn fetch_seed_html(&self) -> Result<String, GatewayError> {
            Ok(r#""INNERTUBE_API_KEY":"AIzaMockKey""#.to_string())
        }
    }

    #[tokio::test]
    async fn test_fetch_video_data_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "videoDetails": { "videoId": "vid-9", "title": "A Video", "author": "Someone" },
            "streamingData": { "formats": [
                { "url": "https://cdn.example/stream", "mimeType": "video/mp4",
                  "bitrate": 1_000_000, "audioQuality": "AUDIO_QUALITY_LOW" }
            ]}
        });
        let mock = server
            .mock("POST", "/youtubei/v1/player")
            .match_query(mockito::Matcher::Regex("key=AIzaMockKey".to_string()))
            .match_body(mockito::Matcher::PartialJson(json!({ "videoId": "vid-9" })))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let http = PlatformClient::with_config(HttpConfig {
            api_base: server.url(),
            ..Default::default()
        });
        let resolver =
            StreamResolver::new(http, Arc::new(CredentialStore::new(Box::new(StaticSeed))));

        let response = resolver.fetch_video_data("vid-9").await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.video_details.as_ref().unwrap().video_id, "vid-9");
        assert_eq!(StreamResolver::candidates(&response).len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_video_data_propagates_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/youtubei/v1/player")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let http = PlatformClient::with_config(HttpConfig {
            api_base: server.url(),
            ..Default::default()
        });
        let resolver =
            StreamResolver::new(http, Arc::new(CredentialStore::new(Box::new(StaticSeed))));

        let result = resolver.fetch_video_data("vid-9").await;
        assert!(matches!(result, Err(GatewayError::UpstreamStatus(500))));
    }
}
