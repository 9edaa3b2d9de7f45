//! Page-excerpt fetching for classification prompts.
//!
//! Fetching is best-effort by contract: a link whose page cannot be
//! retrieved is classified on its URL alone, so every failure path here
//! returns an empty excerpt instead of an error.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

/// Fetches and cleans the text of an external page.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Returns the cleaned page text, or an empty string on any failure.
    async fn fetch(&self, url: &str) -> String;
}

/// HTTP fetcher with a per-request timeout and a length cap on the
/// extracted text.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_chars: usize,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, max_chars: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
            max_chars,
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> String {
        let response = match self.client.get(url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(url, error = %e, "content fetch failed");
                return String::new();
            }
        };
        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "content fetch rejected");
            return String::new();
        }
        match response.text().await {
            Ok(body) => clean_html(&body, self.max_chars),
            Err(e) => {
                tracing::debug!(url, error = %e, "content body unreadable");
                String::new()
            }
        }
    }
}

static SCRIPT_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script pattern"));
static STYLE_BLOCKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style pattern"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));

/// Reduce an HTML page to whitespace-collapsed visible text, capped at
/// `max_chars` characters.
pub(crate) fn clean_html(html: &str, max_chars: usize) -> String {
    let without_scripts = SCRIPT_BLOCKS.replace_all(html, " ");
    let without_styles = STYLE_BLOCKS.replace_all(&without_scripts, " ");
    let without_tags = TAGS.replace_all(&without_styles, " ");
    let mut text = without_tags
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if let Some((boundary, _)) = text.char_indices().nth(max_chars) {
        text.truncate(boundary);
    }
    text
}

/// Video pages are never fetched or summarized; they get a fixed
/// annotation instead.
pub(crate) fn is_video_url(url: &str) -> bool {
    let rest = url.split("://").nth(1).unwrap_or(url);
    let host = rest.split('/').next().unwrap_or(rest).to_lowercase();
    host == "youtu.be" || host == "youtube.com" || host.ends_with(".youtube.com")
}
