//! Mock capability backends for deterministic testing.
//!
//! Each mock records the calls made to it so tests can assert on call
//! counts (e.g. the content worker's idempotence guard performs zero
//! external calls).

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mentora_core::{
    Error, GenerationBackend, RawFetchBackend, Result, VideoLink, VideoSearchBackend,
};

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Scripted generation backend: responses are popped in order; when the
/// script is exhausted the default response (or failure) is returned.
pub struct MockGenerationBackend {
    script: Mutex<VecDeque<Result<String>>>,
    default_response: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_response: Some("mock response".to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful response.
    pub fn with_response(self, text: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(text.to_string()));
        self
    }

    /// Queue a failing response.
    pub fn with_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(Error::Inference(message.to_string())));
        self
    }

    /// Always fail once the script is exhausted.
    pub fn failing_by_default(mut self) -> Self {
        self.default_response = None;
        self
    }

    /// Prompts received so far.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }
        match &self.default_response {
            Some(text) => Ok(text.clone()),
            None => Err(Error::Inference("mock generation failure".into())),
        }
    }
}

impl Default for MockGenerationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    async fn generate_json(&self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

// ---------------------------------------------------------------------------
// Video search
// ---------------------------------------------------------------------------

/// Mock video search returning a fixed link, or failing when configured.
pub struct MockVideoSearch {
    link: Option<VideoLink>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockVideoSearch {
    /// Succeed with a deterministic link derived from a fixed video id.
    pub fn new() -> Self {
        Self {
            link: Some(VideoLink {
                watch_url: "https://www.youtube.com/watch?v=mock000".to_string(),
                embed_url: "https://www.youtube.com/embed/mock000".to_string(),
            }),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every search.
    pub fn failing() -> Self {
        Self {
            link: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockVideoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoSearchBackend for MockVideoSearch {
    async fn search(&self, query: &str) -> Result<VideoLink> {
        self.calls.lock().unwrap().push(query.to_string());
        self.link
            .clone()
            .ok_or_else(|| Error::VideoSearch("mock search failure".into()))
    }
}

// ---------------------------------------------------------------------------
// Raw fetch
// ---------------------------------------------------------------------------

/// Mock raw fetcher backed by a URL → content map. Unknown URLs resolve to
/// not-found; URLs registered with [`with_error`](Self::with_error) fail
/// with a transport error.
pub struct MockRawFetcher {
    content: HashMap<String, String>,
    errors: Vec<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockRawFetcher {
    pub fn new() -> Self {
        Self {
            content: HashMap::new(),
            errors: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_content(mut self, url: &str, text: &str) -> Self {
        self.content.insert(url.to_string(), text.to_string());
        self
    }

    pub fn with_error(mut self, url: &str) -> Self {
        self.errors.push(url.to_string());
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

impl Default for MockRawFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RawFetchBackend for MockRawFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.errors.iter().any(|e| e == url) {
            return Err(Error::Request("mock transport failure".into()));
        }
        Ok(self.content.get(url).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_responses_pop_in_order() {
        let backend = MockGenerationBackend::new()
            .with_response("first")
            .with_failure("boom");

        assert_eq!(backend.generate("a").await.unwrap(), "first");
        assert!(backend.generate("b").await.is_err());
        // Script exhausted: default response.
        assert_eq!(backend.generate("c").await.unwrap(), "mock response");
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn failing_by_default_fails_after_script() {
        let backend = MockGenerationBackend::new().failing_by_default();
        assert!(backend.generate_json("x").await.is_err());
    }

    #[tokio::test]
    async fn video_mock_records_queries() {
        let search = MockVideoSearch::new();
        let link = search.search("Ownership in Rust").await.unwrap();
        assert!(link.watch_url.contains("watch?v="));
        assert_eq!(search.call_count(), 1);

        let failing = MockVideoSearch::failing();
        assert!(failing.search("anything").await.is_err());
    }

    #[tokio::test]
    async fn raw_fetcher_distinguishes_missing_from_error() {
        let fetcher = MockRawFetcher::new()
            .with_content("https://x/a", "hello")
            .with_error("https://x/b");

        assert_eq!(
            fetcher.fetch("https://x/a").await.unwrap(),
            Some("hello".to_string())
        );
        assert!(fetcher.fetch("https://x/b").await.is_err());
        assert_eq!(fetcher.fetch("https://x/c").await.unwrap(), None);
    }
}
