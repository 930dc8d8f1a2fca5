//! YouTube Data API v3 tier.
//!
//! Uses `videos.list` for metadata and paginated `commentThreads.list`
//! (relevance order) for comments. Replies embedded in a thread are
//! flattened right after their parent with `is_reply` set.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{AcquisitionTier, HttpClient, TierOutcome};
use crate::model::{Item, RawComment};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The API returns at most this many threads per page.
const PAGE_LIMIT: usize = 100;

/// Credentialed tier backed by the YouTube Data API.
pub struct ApiTier {
    client: HttpClient,
    api_key: String,
}

impl ApiTier {
    pub fn new(client: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    async fn video(&self, item_id: &str) -> Result<Item> {
        let response: VideoListResponse = self
            .client
            .get_json(
                &format!("{API_BASE}/videos"),
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", item_id),
                    ("key", self.api_key.as_str()),
                ],
            )
            .await
            .context("videos.list failed")?;

        let video = response
            .items
            .into_iter()
            .next()
            .with_context(|| format!("Video not found: {item_id}"))?;
        Ok(video.into_item(item_id))
    }

    async fn threads(&self, item_id: &str, max_count: usize) -> Result<Vec<RawComment>> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let page_size = max_count.min(PAGE_LIMIT).max(1).to_string();

        while comments.len() < max_count {
            let page: CommentThreadListResponse = {
                let mut query = vec![
                    ("part", "snippet,replies"),
                    ("videoId", item_id),
                    ("maxResults", page_size.as_str()),
                    ("order", "relevance"),
                    ("textFormat", "plainText"),
                    ("key", self.api_key.as_str()),
                ];
                if let Some(token) = page_token.as_deref() {
                    query.push(("pageToken", token));
                }
                self.client
                    .get_json(&format!("{API_BASE}/commentThreads"), &query)
                    .await
                    .context("commentThreads.list failed")?
            };
            debug!("commentThreads page with {} threads", page.items.len());

            for thread in page.items {
                flatten_thread(thread, &mut comments);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        comments.truncate(max_count);
        Ok(comments)
    }
}

#[async_trait]
impl AcquisitionTier for ApiTier {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn fetch_item(&self, item_id: &str) -> TierOutcome<Item> {
        self.video(item_id).await.into()
    }

    async fn fetch_comments(&self, item_id: &str, max_count: usize) -> TierOutcome<Vec<RawComment>> {
        self.threads(item_id, max_count).await.into()
    }
}

/// Push the top-level comment, then its replies.
fn flatten_thread(thread: CommentThread, out: &mut Vec<RawComment>) {
    let top = thread.snippet.top_level_comment;
    let parent_id = top.id.clone();
    out.push(top.snippet.into_raw(top.id, thread.snippet.total_reply_count, None));

    if let Some(replies) = thread.replies {
        for reply in replies.comments {
            out.push(reply.snippet.into_raw(reply.id, 0, Some(parent_id.clone())));
        }
    }
}

// ============================================================================
// YouTube Data API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<Video>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Video {
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: VideoStatistics,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    #[serde(default)]
    description: String,
    published_at: DateTime<Utc>,
    channel_title: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Counts arrive as decimal strings and may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

fn parse_count(value: Option<&String>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

impl Video {
    fn into_item(self, item_id: &str) -> Item {
        Item {
            item_id: item_id.to_string(),
            title: self.snippet.title,
            description: self.snippet.description,
            view_count: parse_count(self.statistics.view_count.as_ref()),
            like_count: parse_count(self.statistics.like_count.as_ref()),
            comment_count: parse_count(self.statistics.comment_count.as_ref()),
            duration: self.content_details.map(|d| d.duration).unwrap_or_default(),
            published_at: self.snippet.published_at,
            channel: self.snippet.channel_title,
            tags: self.snippet.tags.into_iter().collect::<BTreeSet<_>>(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadListResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
    replies: Option<ThreadReplies>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: ApiComment,
    #[serde(default)]
    total_reply_count: u32,
}

#[derive(Debug, Deserialize)]
struct ThreadReplies {
    #[serde(default)]
    comments: Vec<ApiComment>,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    id: String,
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    author_display_name: String,
    text_display: String,
    #[serde(default)]
    like_count: u64,
    published_at: DateTime<Utc>,
}

impl CommentSnippet {
    fn into_raw(self, id: String, reply_count: u32, parent_id: Option<String>) -> RawComment {
        RawComment {
            comment_id: id,
            author: self.author_display_name,
            text: self.text_display,
            like_count: self.like_count,
            timestamp: self.published_at,
            reply_count,
            is_reply: parent_id.is_some(),
            parent_id,
            sentiment: None,
        }
    }
}
