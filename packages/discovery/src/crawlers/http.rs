//! Plain HTTP fallback crawler.
//!
//! Breadth-first traversal of same-origin links, suitable for sites that
//! render server-side. Script-heavy sites need the browser variant.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::crawlers::{Crawler, Frontier};
use crate::error::{CrawlError, CrawlResult};
use crate::fetcher::PageFetcher;
use crate::html::{extract_links, extract_title};
use crate::normalize::normalize_for_crawl;
use crate::types::{DiscoverConfig, DiscoveredPage, PageOrigin};

/// Fallback crawler that fetches pages over HTTP and parses links out of
/// the raw HTML.
pub struct HttpCrawler {
    fetcher: Arc<dyn PageFetcher>,
}

impl HttpCrawler {
    /// Create a crawler over the given fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Crawler for HttpCrawler {
    async fn crawl(&self, config: &DiscoverConfig) -> CrawlResult<Vec<DiscoveredPage>> {
        let root = Url::parse(&config.root_url).map_err(|_| CrawlError::InvalidUrl {
            url: config.root_url.clone(),
        })?;

        info!(url = %root, budget = config.page_budget, "HTTP fallback crawl starting");

        let mut frontier = Frontier::new(&root);
        let mut pages: Vec<DiscoveredPage> = Vec::new();

        while let Some(url) = frontier.next() {
            if pages.len() >= config.page_budget {
                break;
            }

            match self.fetcher.get(&url).await {
                Ok(response) if response.is_success() && response.is_html() => {
                    let mut page =
                        DiscoveredPage::new(url.as_str(), PageOrigin::FallbackCrawl)
                            .with_html(response.body.clone());
                    if let Some(title) = extract_title(&response.body) {
                        page = page.with_title(title);
                    }

                    let mut new_links = 0;
                    for href in extract_links(&response.body) {
                        if let Some(link) = normalize_for_crawl(&response.final_url, &href) {
                            if frontier.enqueue(link) {
                                new_links += 1;
                            }
                        }
                    }

                    debug!(
                        url = %url,
                        new_links,
                        harvested = pages.len() + 1,
                        "Page harvested"
                    );
                    pages.push(page);
                }
                Ok(response) => {
                    debug!(
                        url = %url,
                        status = response.status,
                        content_type = ?response.content_type,
                        "Skipping non-HTML or non-2xx response"
                    );
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to fetch page");
                }
            }

            if config.rate_limit_ms > 0 && frontier.pending() > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(config.rate_limit_ms)).await;
            }
        }

        info!(
            url = %root,
            pages_harvested = pages.len(),
            urls_seen = frontier.seen_count(),
            "HTTP fallback crawl finished"
        );

        Ok(pages)
    }
}
