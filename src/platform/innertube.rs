//! Listing and comment queries against the private JSON API
//!
//! The platform nests listing entries in renderer shells that move
//! between surfaces and revisions, so normalization walks the response
//! tree in document order instead of typing every shell. Entry order
//! comes from JSON arrays and survives the walk untouched.

use crate::core::model::{
    ChannelMetadata, ChannelPage, CommentReply, CommentSort, CommentThread, TrendingCategory,
    VideoDescriptor, MAX_NESTED_REPLIES,
};
use crate::error::GatewayError;
use crate::platform::bootstrap::{CredentialStore, Credentials};
use crate::platform::client::{PlatformClient, FALLBACK_CLIENT_VERSION, WEB_CLIENT_NAME};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Browse identifier of the trending feed
const TRENDING_BROWSE_ID: &str = "FEtrending";

/// Browse params token selecting a channel's videos tab
const CHANNEL_VIDEOS_PARAMS: &str = "EgZ2aWRlb3M%3D";

/// Client for the platform's private listing endpoints
pub struct InnerTubeClient {
    http: PlatformClient,
    credentials: Arc<CredentialStore>,
}

impl InnerTubeClient {
    /// Create a client over a shared HTTP client and credential store
    pub fn new(http: PlatformClient, credentials: Arc<CredentialStore>) -> Self {
        Self { http, credentials }
    }

    /// Search videos, relevance order preserved, truncated to `max_results`
    pub async fn search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<VideoDescriptor>, GatewayError> {
        debug!("Searching for {:?} in region {}", query, region);
        let response = self
            .call("search", region, json!({ "query": query }))
            .await?;
        require_field(&response, "contents")?;
        Ok(parse_video_listing(&response, max_results))
    }

    /// Trending feed, platform order preserved, truncated to `max_results`
    pub async fn trending(
        &self,
        category: Option<TrendingCategory>,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<VideoDescriptor>, GatewayError> {
        let mut params = json!({ "browseId": TRENDING_BROWSE_ID });
        if let Some(category) = category {
            params["params"] = Value::String(category.params_token().to_string());
        }

        let response = self.call("browse", region, params).await?;
        require_field(&response, "contents")?;
        Ok(parse_video_listing(&response, max_results))
    }

    /// Channel metadata plus uploads in platform order
    pub async fn browse(&self, channel_id: &str) -> Result<ChannelPage, GatewayError> {
        let response = self
            .call(
                "browse",
                "US",
                json!({ "browseId": channel_id, "params": CHANNEL_VIDEOS_PARAMS }),
            )
            .await?;
        parse_channel_page(&response)
    }

    /// Comment threads for a video, each with at most five nested replies.
    /// Two round trips: the first `next` call surfaces the comment-section
    /// continuation, the second returns the threads.
    pub async fn comments(
        &self,
        video_id: &str,
        max_results: usize,
        sort: CommentSort,
    ) -> Result<Vec<CommentThread>, GatewayError> {
        let surface = self
            .call("next", "US", json!({ "videoId": video_id }))
            .await?;
        let token = comments_continuation(&surface, sort)
            .ok_or(GatewayError::MalformedPayload("comment continuation"))?;

        let response = self
            .call("next", "US", json!({ "continuation": token }))
            .await?;
        Ok(parse_comment_threads(&response, max_results))
    }

    /// Issue one authenticated API call, merging the client context into
    /// the endpoint parameters
    async fn call(
        &self,
        endpoint: &str,
        region: &str,
        mut payload: Value,
    ) -> Result<Value, GatewayError> {
        let credentials = self.credentials.get().await?;
        payload["context"] = client_context(&credentials, region);

        let request = self.http.innertube_post(endpoint, &credentials, &payload)?;
        self.http.execute_json(request).await
    }
}

/// Request context identifying us as the platform's own web client
fn client_context(credentials: &Credentials, region: &str) -> Value {
    let mut client = json!({
        "clientName": WEB_CLIENT_NAME,
        "clientVersion": credentials
            .client_version
            .as_deref()
            .unwrap_or(FALLBACK_CLIENT_VERSION),
        "hl": "en",
        "gl": region,
    });

    if let Some(visitor) = credentials.visitor_data.as_deref() {
        client["visitorData"] = Value::String(visitor.to_string());
    }

    json!({ "client": client })
}

fn require_field(response: &Value, field: &'static str) -> Result<(), GatewayError> {
    if response.get(field).is_none() {
        warn!("API payload is missing {:?}", field);
        return Err(GatewayError::MalformedPayload(field));
    }
    Ok(())
}

/// Collect every object stored under `key`, depth-first in document order
fn collect<'a>(value: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    walk(value, key, &mut found);
    found
}

fn walk<'a>(value: &'a Value, key: &str, found: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                if name == key {
                    found.push(child);
                }
                walk(child, key, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, key, found);
            }
        }
        _ => {}
    }
}

/// Text of a label node, handling both `simpleText` and `runs` shapes
fn text_of(node: &Value) -> Option<String> {
    if let Some(simple) = node.get("simpleText").and_then(Value::as_str) {
        return Some(simple.to_string());
    }

    let runs = node.get("runs")?.as_array()?;
    let joined: String = runs
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn thumbnail_urls(node: Option<&Value>) -> Vec<String> {
    node.and_then(|n| n.get("thumbnails"))
        .and_then(Value::as_array)
        .map(|thumbnails| {
            thumbnails
                .iter()
                .filter_map(|t| t.get("url").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn video_descriptor(renderer: &Value) -> Option<VideoDescriptor> {
    let video_id = renderer.get("videoId")?.as_str()?;
    if video_id.is_empty() {
        return None;
    }

    let author = ["ownerText", "shortBylineText", "longBylineText"]
        .iter()
        .find_map(|key| renderer.get(*key).and_then(text_of))
        .unwrap_or_default();

    Some(VideoDescriptor {
        video_id: video_id.to_string(),
        title: renderer.get("title").and_then(text_of).unwrap_or_default(),
        author,
        duration_text: renderer.get("lengthText").and_then(text_of),
        thumbnail_urls: thumbnail_urls(renderer.get("thumbnail")),
        view_count_text: renderer.get("viewCountText").and_then(text_of),
    })
}

/// Normalize every video entry in a listing response, preserving
/// platform order, truncated to `max_results`
pub(crate) fn parse_video_listing(response: &Value, max_results: usize) -> Vec<VideoDescriptor> {
    let mut videos = Vec::new();
    for key in ["videoRenderer", "gridVideoRenderer"] {
        for renderer in collect(response, key) {
            if let Some(descriptor) = video_descriptor(renderer) {
                videos.push(descriptor);
            }
        }
        // the two renderer shapes never appear in the same listing
        if !videos.is_empty() {
            break;
        }
    }
    videos.truncate(max_results);
    videos
}

pub(crate) fn parse_channel_page(response: &Value) -> Result<ChannelPage, GatewayError> {
    let metadata = response
        .pointer("/metadata/channelMetadataRenderer")
        .ok_or(GatewayError::MalformedPayload("channelMetadataRenderer"))?;

    let subscriber_count_text = response
        .pointer("/header/c4TabbedHeaderRenderer/subscriberCountText")
        .and_then(text_of);

    Ok(ChannelPage {
        metadata: ChannelMetadata {
            title: metadata
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Unknown Channel")
                .to_string(),
            description: metadata
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            subscriber_count_text,
            avatar_urls: thumbnail_urls(metadata.get("avatar")),
        },
        videos: parse_video_listing(response, usize::MAX),
    })
}

/// Find the continuation token for a video's comment section.
/// The sort sub-menu carries one token per ordering; when the menu is
/// absent the first continuation in the payload is used.
pub(crate) fn comments_continuation(response: &Value, sort: CommentSort) -> Option<String> {
    if let Some(menu) = collect(response, "sortFilterSubMenuRenderer").into_iter().next() {
        let token = menu
            .get("subMenuItems")
            .and_then(Value::as_array)
            .and_then(|items| items.get(sort.menu_index()))
            .and_then(|item| item.pointer("/serviceEndpoint/continuationCommand/token"))
            .and_then(Value::as_str);
        if let Some(token) = token {
            return Some(token.to_string());
        }
    }

    collect(response, "continuationItemRenderer")
        .into_iter()
        .find_map(|item| {
            item.pointer("/continuationEndpoint/continuationCommand/token")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
}

fn comment_fields(renderer: &Value) -> Option<(String, String)> {
    let text = renderer.get("contentText").and_then(text_of)?;
    let author = renderer
        .get("authorText")
        .and_then(text_of)
        .unwrap_or_default();
    Some((author, text))
}

pub(crate) fn parse_comment_threads(response: &Value, max_results: usize) -> Vec<CommentThread> {
    let mut threads = Vec::new();

    for thread in collect(response, "commentThreadRenderer") {
        if threads.len() >= max_results {
            break;
        }

        let Some((author, text)) = thread
            .pointer("/comment/commentRenderer")
            .and_then(comment_fields)
        else {
            continue;
        };

        let replies = thread
            .get("replies")
            .map(|subtree| {
                collect(subtree, "commentRenderer")
                    .into_iter()
                    .filter_map(comment_fields)
                    .map(|(author, text)| CommentReply { author, text })
                    .take(MAX_NESTED_REPLIES)
                    .collect()
            })
            .unwrap_or_default();

        threads.push(CommentThread {
            author,
            text,
            replies,
        });
    }

    threads
}
