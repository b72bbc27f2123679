// src/services/youtube.rs

use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::AppError;

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";
/// YouTube's "Education" category.
const EDUCATION_CATEGORY: &str = "27";

static VIDEO_ID: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|embed/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})")
        .ok()
});

/// A video attached to a lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoLink {
    pub video_id: String,
    pub video_url: String,
    pub title: String,
    pub channel: String,
}

/// Finds a teaching video for a topic. Lookups never fail the caller:
/// any problem means "no video".
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn find_lesson_video(&self, subject: &str, topic: &str) -> Option<VideoLink>;
}

/// Used when no YouTube key is configured.
pub struct NoVideoSearch;

#[async_trait]
impl VideoSearch for NoVideoSearch {
    async fn find_lesson_video(&self, _subject: &str, _topic: &str) -> Option<VideoLink> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}

/// YouTube Data API v3 search client.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| AppError::InternalServerError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_key })
    }

    fn search_url(&self, query: &str) -> Result<Url, AppError> {
        Url::parse_with_params(
            SEARCH_ENDPOINT,
            &[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", "1"),
                ("videoCategoryId", EDUCATION_CATEGORY),
                ("order", "relevance"),
                ("safeSearch", "strict"),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    /// Top result for one query.
    async fn search(&self, query: &str) -> Result<Option<VideoLink>, AppError> {
        let url = self.search_url(query)?;

        let response: SearchResponse = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| AppError::ExternalService(format!("YouTube API error: {e}")))?
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("YouTube API error: {e}")))?;

        Ok(response.items.into_iter().find_map(|item| {
            let video_id = item.id.video_id?;
            Some(VideoLink {
                video_url: watch_url(&video_id),
                video_id,
                title: item.snippet.title,
                channel: item.snippet.channel_title,
            })
        }))
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn find_lesson_video(&self, subject: &str, topic: &str) -> Option<VideoLink> {
        let queries = [
            format!("{topic} {subject}"),
            format!("{topic} {subject} tutorial"),
        ];

        for query in &queries {
            match self.search(query).await {
                Ok(Some(video)) => return Some(video),
                Ok(None) => tracing::debug!(%query, "No video found"),
                Err(e) => tracing::warn!(%query, "Video search failed: {:?}", e),
            }
        }

        None
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Pulls the 11-character id out of watch, short-link, embed or shorts URLs.
pub fn extract_video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .as_ref()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_common_url_shapes() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ?t=10"), id);
        assert_eq!(extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            id
        );
        assert_eq!(extract_video_id("https://example.com/watch?v=short"), None);
    }

    #[test]
    fn watch_url_round_trips_through_extraction() {
        let url = watch_url("abcdefghijk");
        assert_eq!(extract_video_id(&url).as_deref(), Some("abcdefghijk"));
    }

    #[test]
    fn search_url_targets_safe_education_results() {
        let client = YouTubeClient::new("key".into()).unwrap();
        let url = client.search_url("Waves Physics").unwrap();
        let query = url.query().unwrap_or_default();
        assert!(query.contains("q=Waves+Physics"));
        assert!(query.contains("videoCategoryId=27"));
        assert!(query.contains("safeSearch=strict"));
    }

    #[tokio::test]
    async fn disabled_search_finds_nothing() {
        assert_eq!(NoVideoSearch.find_lesson_video("Physics", "Waves").await, None);
    }
}
