//! Bridge between the job runner and the discovery crate.

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use discovery::{
    discover_site, html::extract_title, BrowserCrawler, CrawlError, CrawlResult, DiscoverConfig,
    DiscoveredPage, DiscoveryOutcome, HttpCrawler, HttpFetcher, PageFetcher, PageOrigin,
};

/// Discovery seam consumed by the job runner, mockable in tests.
#[async_trait]
pub trait SiteDiscoverer: Send + Sync {
    /// Fetch the root page itself (used for language detection and as the
    /// seed record). `None` when the root is unreachable or not HTML.
    async fn fetch_root(&self, config: &DiscoverConfig) -> Option<DiscoveredPage>;

    /// Run the full discovery pipeline.
    async fn discover(
        &self,
        config: &DiscoverConfig,
        language: &str,
        use_browser: bool,
    ) -> CrawlResult<DiscoveryOutcome>;

    /// Fetch one page's HTML for extraction when discovery did not cache it.
    async fn fetch_page(&self, url: &str) -> CrawlResult<DiscoveredPage>;
}

/// Production discoverer over real HTTP (and a browser when asked).
pub struct WebDiscoverer {
    fetcher: Arc<dyn PageFetcher>,
}

impl Default for WebDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

impl WebDiscoverer {
    /// Create a discoverer with the default HTTP fetcher.
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(HttpFetcher::new()),
        }
    }

    /// Create a discoverer over a custom fetcher.
    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SiteDiscoverer for WebDiscoverer {
    async fn fetch_root(&self, config: &DiscoverConfig) -> Option<DiscoveredPage> {
        let url = Url::parse(&config.root_url).ok()?;
        let response = self.fetcher.get(&url).await.ok()?;
        if !response.is_success() || !response.is_html() {
            return None;
        }

        let mut page =
            DiscoveredPage::new(url.as_str(), PageOrigin::Seed).with_html(response.body.clone());
        if let Some(title) = extract_title(&response.body) {
            page = page.with_title(title);
        }
        Some(page)
    }

    async fn discover(
        &self,
        config: &DiscoverConfig,
        language: &str,
        use_browser: bool,
    ) -> CrawlResult<DiscoveryOutcome> {
        if use_browser {
            let crawler = BrowserCrawler::new();
            discover_site(self.fetcher.clone(), &crawler, config, language).await
        } else {
            let crawler = HttpCrawler::new(self.fetcher.clone());
            discover_site(self.fetcher.clone(), &crawler, config, language).await
        }
    }

    async fn fetch_page(&self, url: &str) -> CrawlResult<DiscoveredPage> {
        let parsed = Url::parse(url).map_err(|_| CrawlError::InvalidUrl {
            url: url.to_string(),
        })?;
        let response = self.fetcher.get(&parsed).await?;

        let mut page =
            DiscoveredPage::new(url, PageOrigin::Seed).with_html(response.body.clone());
        if let Some(title) = extract_title(&response.body) {
            page = page.with_title(title);
        }
        Ok(page)
    }
}
