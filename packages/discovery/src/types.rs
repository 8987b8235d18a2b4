//! Discovery data types - pages and crawl configuration.

use serde::{Deserialize, Serialize};

/// Which strategy first observed a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOrigin {
    /// Listed in an XML or plain-text sitemap
    Sitemap,
    /// Confirmed by probing a conventional path slug
    Probe,
    /// Harvested by the fallback breadth-first crawl
    FallbackCrawl,
    /// The root page itself, fetched directly
    Seed,
}

/// A page found by one of the discovery strategies.
///
/// The aggregate map holds at most one `DiscoveredPage` per normalized URL;
/// when several strategies find the same URL the record is enriched in place
/// via [`DiscoveredPage::absorb`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPage {
    /// Normalized URL - the unique key in the aggregate map
    pub url: String,

    /// Page title if a fetch has seen one
    pub title: Option<String>,

    /// Strategy that first observed this URL
    pub origin: PageOrigin,

    /// Cached document body, when a strategy fetched the page fully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Optional tag assigned by later classification
    pub classification: Option<String>,
}

impl DiscoveredPage {
    /// Create a page record with no fetched content yet.
    pub fn new(url: impl Into<String>, origin: PageOrigin) -> Self {
        Self {
            url: url.into(),
            title: None,
            origin,
            html: None,
            classification: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach a fetched document body.
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Merge another observation of the same URL into this record.
    ///
    /// Non-null `title`/`html`/`classification` from the other record fill
    /// gaps here; `origin` keeps the first writer.
    pub fn absorb(&mut self, other: DiscoveredPage) {
        if self.title.is_none() {
            self.title = other.title;
        }
        if self.html.is_none() {
            self.html = other.html;
        }
        if self.classification.is_none() {
            self.classification = other.classification;
        }
    }
}

/// Configuration for a discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverConfig {
    /// Root URL of the target site
    pub root_url: String,

    /// Hard ceiling on pages harvested by a fallback crawl
    pub page_budget: usize,

    /// Run the fallback crawler only when fewer pages than this were found
    pub min_before_fallback: usize,

    /// Delay between successive requests to the host (milliseconds, 0 = none)
    pub rate_limit_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Total sitemap documents fetched per resolution, on top of the
    /// cycle-guarding seen-set
    pub max_sitemap_fetches: usize,

    /// Concurrent existence checks during core-path probing
    pub probe_concurrency: usize,

    /// How many sitemap-discovered pages get a title-enrichment fetch
    pub title_fetch_limit: usize,

    /// Settle time after a browser page load before harvesting (milliseconds)
    pub render_wait_ms: u64,
}

impl DiscoverConfig {
    /// Create a config for a root URL with default limits.
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            page_budget: 30,
            min_before_fallback: 20,
            rate_limit_ms: 250,
            request_timeout_secs: 30,
            max_sitemap_fetches: 50,
            probe_concurrency: 5,
            title_fetch_limit: 30,
            render_wait_ms: 3000,
        }
    }

    /// Set the fallback crawl page budget.
    pub fn with_page_budget(mut self, budget: usize) -> Self {
        self.page_budget = budget;
        self
    }

    /// Set the threshold below which the fallback crawler runs.
    pub fn with_min_before_fallback(mut self, min: usize) -> Self {
        self.min_before_fallback = min;
        self
    }

    /// Set the politeness delay between requests.
    pub fn with_rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Set the sitemap fetch cap.
    pub fn with_max_sitemap_fetches(mut self, max: usize) -> Self {
        self.max_sitemap_fetches = max;
        self
    }

    /// Set the render-settle delay for browser crawls.
    pub fn with_render_wait_ms(mut self, ms: u64) -> Self {
        self.render_wait_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_fills_gaps_only() {
        let mut first = DiscoveredPage::new("https://example.com/a", PageOrigin::Sitemap);
        let second = DiscoveredPage::new("https://example.com/a", PageOrigin::Probe)
            .with_title("About")
            .with_html("<html></html>");

        first.absorb(second);

        assert_eq!(first.origin, PageOrigin::Sitemap); // first writer wins
        assert_eq!(first.title.as_deref(), Some("About"));
        assert!(first.html.is_some());
    }

    #[test]
    fn absorb_does_not_overwrite_existing_fields() {
        let mut first = DiscoveredPage::new("https://example.com/a", PageOrigin::Probe)
            .with_title("Original")
            .with_html("<p>one</p>");
        let second = DiscoveredPage::new("https://example.com/a", PageOrigin::FallbackCrawl)
            .with_title("Replacement")
            .with_html("<p>two</p>");

        first.absorb(second);

        assert_eq!(first.title.as_deref(), Some("Original"));
        assert_eq!(first.html.as_deref(), Some("<p>one</p>"));
    }
}
