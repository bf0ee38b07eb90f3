//! GitHub evidence fetching for submission grading.
//!
//! Probe planning is a pure function kept apart from network I/O: given a
//! submission URL it produces an ordered, short-circuiting list of raw
//! content URLs to try. [`CodeEvidenceFetcher`] walks that plan with a
//! [`RawFetchBackend`] and degrades to an empty snippet on any failure —
//! evidence gathering never fails a grading job.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use mentora_core::{defaults, Error, RawFetchBackend, Result};

/// Branches probed when a submission links a repository root.
const DEFAULT_BRANCHES: &[&str] = &["main", "master"];

/// Conventional entry-point and manifest filenames probed per branch,
/// in priority order.
const CANDIDATE_FILES: &[&str] = &[
    "src/main.rs",
    "src/index.ts",
    "src/index.js",
    "index.js",
    "main.py",
    "app.py",
    "Cargo.toml",
    "package.json",
    "requirements.txt",
];

/// README fallback probed after the entry-point candidates.
const README_FILE: &str = "README.md";

/// Build the ordered list of raw-content URLs to probe for a submission
/// link. Returns an empty plan for non-GitHub URLs.
///
/// - A `/blob/` URL addresses one file: the plan is exactly its raw form.
/// - A repository link fans out to entry-point and manifest files across the
///   default branches, then READMEs.
pub fn probe_plan(url: &str) -> Vec<String> {
    let url = url.trim().trim_end_matches('/');
    if !url.contains("github.com") {
        return Vec::new();
    }

    if url.contains("/blob/") {
        return vec![url
            .replace("github.com", "raw.githubusercontent.com")
            .replace("/blob/", "/")];
    }

    // Expect https://github.com/{owner}/{repo}; anything deeper (issues,
    // tree views) is out of probing scope.
    let path = match url.split("github.com/").nth(1) {
        Some(p) => p,
        None => return Vec::new(),
    };
    let mut segments = path.split('/');
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    if owner.is_empty() || repo.is_empty() || segments.next().is_some() {
        return Vec::new();
    }

    let mut plan = Vec::new();
    for branch in DEFAULT_BRANCHES {
        for file in CANDIDATE_FILES {
            plan.push(format!(
                "https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{file}"
            ));
        }
    }
    for branch in DEFAULT_BRANCHES {
        plan.push(format!(
            "https://raw.githubusercontent.com/{owner}/{repo}/{branch}/{README_FILE}"
        ));
    }
    plan
}

/// Truncate fetched evidence to the prompt budget on a char boundary.
fn clip_snippet(text: &str) -> String {
    text.chars().take(defaults::SNIPPET_MAX_CHARS).collect()
}

/// Best-effort code evidence fetcher walking a [`probe_plan`].
pub struct CodeEvidenceFetcher {
    fetcher: Arc<dyn RawFetchBackend>,
}

impl CodeEvidenceFetcher {
    pub fn new(fetcher: Arc<dyn RawFetchBackend>) -> Self {
        Self { fetcher }
    }

    /// Fetch a snippet of reference material for a submission URL.
    ///
    /// Returns the first probe hit (clipped to the prompt budget), the
    /// "no code found" sentinel when a recognized repository yields nothing,
    /// or an empty string for unrecognized URLs.
    #[instrument(skip(self), fields(subsystem = "inference", component = "github", op = "snippet"))]
    pub async fn snippet(&self, url: &str) -> String {
        let plan = probe_plan(url);
        if plan.is_empty() {
            return String::new();
        }

        for candidate in &plan {
            match self.fetcher.fetch(candidate).await {
                Ok(Some(text)) => {
                    debug!(candidate = %candidate, len = text.len(), "Evidence probe hit");
                    return clip_snippet(&text);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "Evidence probe failed, continuing");
                    continue;
                }
            }
        }

        defaults::NO_CODE_FOUND.to_string()
    }
}

/// HTTP implementation of [`RawFetchBackend`].
pub struct HttpRawFetcher {
    client: Client,
}

impl HttpRawFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(defaults::FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RawFetchBackend for HttpRawFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Raw fetch failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Request(format!(
                "Raw fetch returned {}",
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Raw fetch body failed: {e}")))?;
        Ok(Some(text))
    }
}
