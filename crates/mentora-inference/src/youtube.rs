//! YouTube video-search backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use mentora_core::{defaults, Error, Result, VideoLink, VideoSearchBackend};

/// Default YouTube search endpoint.
pub const DEFAULT_YOUTUBE_URL: &str = defaults::YOUTUBE_BASE_URL;

/// YouTube Data API search backend.
pub struct YouTubeSearchBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl YouTubeSearchBackend {
    /// Create a new backend with custom configuration.
    pub fn with_config(base_url: String, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create from environment variables (`YOUTUBE_API_KEY`,
    /// `YOUTUBE_API_BASE_URL`).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("YOUTUBE_API_KEY")
            .map_err(|_| Error::Config("YOUTUBE_API_KEY is not set".into()))?;
        let base_url = std::env::var("YOUTUBE_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_YOUTUBE_URL.to_string());

        Self::with_config(base_url, api_key)
    }
}

#[async_trait]
impl VideoSearchBackend for YouTubeSearchBackend {
    #[instrument(skip(self), fields(subsystem = "inference", component = "youtube", op = "search"))]
    async fn search(&self, query: &str) -> Result<VideoLink> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("key", self.api_key.as_str()),
                ("maxResults", "2"),
            ])
            .send()
            .await
            .map_err(|e| Error::VideoSearch(format!("Search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::VideoSearch(format!(
                "Search request returned {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::VideoSearch(format!("Malformed search response: {e}")))?;

        let video_id = parsed
            .items
            .into_iter()
            .next()
            .map(|item| item.id.video_id)
            .ok_or_else(|| Error::VideoSearch(format!("No results for query '{query}'")))?;

        debug!(video_id = %video_id, "Video search hit");

        Ok(VideoLink {
            watch_url: format!("https://www.youtube.com/watch?v={video_id}"),
            embed_url: format!("https://www.youtube.com/embed/{video_id}"),
        })
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
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_builds_watch_and_embed_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("part", "snippet"))
            .and(query_param("q", "Ownership in Rust"))
            .and(query_param("maxResults", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": { "videoId": "abc123" } },
                    { "id": { "videoId": "def456" } }
                ]
            })))
            .mount(&server)
            .await;

        let backend =
            YouTubeSearchBackend::with_config(server.uri(), "test-key".to_string()).unwrap();
        let link = backend.search("Ownership in Rust").await.unwrap();

        assert_eq!(link.watch_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(link.embed_url, "https://www.youtube.com/embed/abc123");
    }

    #[tokio::test]
    async fn search_fails_on_empty_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })),
            )
            .mount(&server)
            .await;

        let backend =
            YouTubeSearchBackend::with_config(server.uri(), "test-key".to_string()).unwrap();
        let err = backend.search("obscure topic").await.unwrap_err();
        assert!(matches!(err, Error::VideoSearch(_)));
    }

    #[tokio::test]
    async fn search_fails_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let backend =
            YouTubeSearchBackend::with_config(server.uri(), "test-key".to_string()).unwrap();
        let err = backend.search("any").await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
