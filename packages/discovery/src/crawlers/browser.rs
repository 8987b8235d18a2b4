//! Headless-browser fallback crawler.
//!
//! Same frontier discipline as the HTTP variant, but each page is rendered
//! in Chromium so script-driven sites produce real DOM content. Strictly
//! sequential: one browser, one page at a time. The browser process is torn
//! down on every exit path.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::crawlers::{Crawler, Frontier};
use crate::error::{CrawlError, CrawlResult};
use crate::fetcher::DEFAULT_USER_AGENT;
use crate::normalize::normalize_for_crawl;
use crate::types::{DiscoverConfig, DiscoveredPage, PageOrigin};

/// Fallback crawler that drives a headless Chromium session.
pub struct BrowserCrawler {
    user_agent: String,
}

impl Default for BrowserCrawler {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserCrawler {
    /// Create a browser crawler with the default user agent.
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Render-settle, then scroll bottom / middle / top to trigger
    /// lazy-loaded content before the DOM is harvested.
    async fn settle_and_scroll(&self, page: &Page, config: &DiscoverConfig) {
        if config.render_wait_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.render_wait_ms)).await;
        }

        let scroll_steps: [(&str, u64); 3] = [
            ("window.scrollTo(0, document.body.scrollHeight)", 1000),
            ("window.scrollTo(0, document.body.scrollHeight / 2)", 500),
            ("window.scrollTo(0, 0)", 500),
        ];
        for (script, pause_ms) in scroll_steps {
            if let Err(e) = page.evaluate(script).await {
                debug!(error = %e, "Scroll step failed");
                break;
            }
            tokio::time::sleep(Duration::from_millis(pause_ms)).await;
        }
    }

    /// Visit one URL: navigate, settle, capture DOM + title, read links
    /// from the live anchor elements.
    async fn harvest(
        &self,
        browser: &Browser,
        url: &Url,
        config: &DiscoverConfig,
        frontier: &mut Frontier,
    ) -> CrawlResult<DiscoveredPage> {
        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;

        let result = self.harvest_page(&page, url, config, frontier).await;

        // One page at a time; drop the tab before moving on.
        let _ = page.close().await;

        result
    }

    async fn harvest_page(
        &self,
        page: &Page,
        url: &Url,
        config: &DiscoverConfig,
        frontier: &mut Frontier,
    ) -> CrawlResult<DiscoveredPage> {
        page.wait_for_navigation()
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;

        self.settle_and_scroll(page, config).await;

        let title = page
            .get_title()
            .await
            .ok()
            .flatten()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let html = page
            .content()
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;

        // Links come from the rendered document, not the HTML source.
        let hrefs: Vec<String> = match page
            .evaluate("Array.from(document.querySelectorAll('a[href]')).map(a => a.href)")
            .await
        {
            Ok(result) => result.into_value().unwrap_or_default(),
            Err(e) => {
                debug!(url = %url, error = %e, "Could not read anchor elements");
                Vec::new()
            }
        };

        let mut new_links = 0;
        for href in hrefs {
            if let Some(link) = normalize_for_crawl(url, &href) {
                if frontier.enqueue(link) {
                    new_links += 1;
                }
            }
        }
        debug!(url = %url, new_links, html_len = html.len(), "Rendered page harvested");

        let mut discovered =
            DiscoveredPage::new(url.as_str(), PageOrigin::FallbackCrawl).with_html(html);
        if let Some(title) = title {
            discovered = discovered.with_title(title);
        }
        Ok(discovered)
    }

    async fn crawl_with_browser(
        &self,
        browser: &Browser,
        config: &DiscoverConfig,
        root: &Url,
    ) -> Vec<DiscoveredPage> {
        let mut frontier = Frontier::new(root);
        let mut pages: Vec<DiscoveredPage> = Vec::new();

        while let Some(url) = frontier.next() {
            if pages.len() >= config.page_budget {
                break;
            }

            match self.harvest(browser, &url, config, &mut frontier).await {
                Ok(page) => pages.push(page),
                Err(e) => warn!(url = %url, error = %e, "Failed to render page"),
            }

            if config.rate_limit_ms > 0 && frontier.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(config.rate_limit_ms)).await;
            }
        }

        pages
    }
}

#[async_trait]
impl Crawler for BrowserCrawler {
    async fn crawl(&self, config: &DiscoverConfig) -> CrawlResult<Vec<DiscoveredPage>> {
        let root = Url::parse(&config.root_url).map_err(|_| CrawlError::InvalidUrl {
            url: config.root_url.clone(),
        })?;

        info!(url = %root, budget = config.page_budget, "Browser fallback crawl starting");

        let browser_config = BrowserConfig::builder()
            .args(vec![
                "--headless".to_string(),
                "--no-sandbox".to_string(),
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                format!("--user-agent={}", self.user_agent),
            ])
            .build()
            .map_err(CrawlError::Browser)?;

        // Launch failure is fatal for this crawl invocation.
        let (mut browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CrawlError::Browser(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // Crawl, then tear the session down no matter how the crawl went.
        let pages = self.crawl_with_browser(&browser, config, &root).await;

        if let Err(e) = browser.close().await {
            warn!(error = %e, "Browser did not close cleanly");
        }
        let _ = browser.wait().await;
        handler_task.abort();

        info!(url = %root, pages_harvested = pages.len(), "Browser fallback crawl finished");

        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_root_fails_before_launching_a_browser() {
        let crawler = BrowserCrawler::new();
        let result = crawler.crawl(&DiscoverConfig::new("::nope::")).await;
        assert!(matches!(result, Err(CrawlError::InvalidUrl { .. })));
    }
}
