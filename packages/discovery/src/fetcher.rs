//! HTTP fetch seam shared by the discovery strategies.
//!
//! Everything that touches the network goes through [`PageFetcher`] so the
//! sitemap resolver, prober, and HTTP crawler can be exercised offline with
//! the mock in [`crate::testing`].

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{CrawlError, CrawlResult};

/// Default user agent announced on every request.
pub const DEFAULT_USER_AGENT: &str = "SiteKnowledgeBot/0.1 (+https://github.com/site-knowledge)";

/// A fetched HTTP response, body decoded to text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// `Content-Type` header, if present
    pub content_type: Option<String>,

    /// Response body
    pub body: String,
}

impl FetchedPage {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response declared an HTML content type.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// Whether the response looks like an XML document.
    pub fn is_xml(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("xml"))
            .unwrap_or(false)
    }

    /// Whether the response declared a plain-text content type.
    pub fn is_plain_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/plain"))
            .unwrap_or(false)
    }
}

/// Trait for fetching pages over HTTP.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a URL and return the decoded response.
    async fn get(&self, url: &Url) -> CrawlResult<FetchedPage>;

    /// HEAD a URL and return the status code.
    ///
    /// Some servers reject HEAD; callers should treat an error here as
    /// "unknown" and fall back to GET.
    async fn head(&self, url: &Url) -> CrawlResult<u16>;
}

/// Production fetcher over `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with a 30 second timeout and the default user agent.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn map_error(url: &Url, e: reqwest::Error) -> CrawlError {
        if e.is_timeout() {
            CrawlError::Timeout {
                url: url.to_string(),
            }
        } else {
            warn!(url = %url, error = %e, "HTTP request failed");
            CrawlError::Http(Box::new(e))
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get(&self, url: &Url) -> CrawlResult<FetchedPage> {
        debug!(url = %url, "HTTP GET");
        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        Ok(FetchedPage {
            final_url,
            status,
            content_type,
            body,
        })
    }

    async fn head(&self, url: &Url) -> CrawlResult<u16> {
        debug!(url = %url, "HTTP HEAD");
        let response = self
            .client
            .head(url.clone())
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        Ok(response.status().as_u16())
    }
}
