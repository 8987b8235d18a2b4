//! The discovery pipeline: sitemap resolution, core-path probing, and the
//! conditional fallback crawl, merged into one deduplicated page map.

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::aggregate;
use crate::crawlers::Crawler;
use crate::error::{CrawlError, CrawlResult};
use crate::fetcher::PageFetcher;
use crate::html::extract_title;
use crate::prober::CorePageProber;
use crate::sitemap::SitemapResolver;
use crate::types::{DiscoverConfig, DiscoveredPage, PageOrigin};

/// What a discovery run produced, and which strategies contributed.
#[derive(Debug)]
pub struct DiscoveryOutcome {
    /// Deduplicated pages keyed by normalized URL
    pub pages: IndexMap<String, DiscoveredPage>,

    /// URLs contributed by sitemap resolution
    pub sitemap_count: usize,

    /// Pages confirmed by core-path probing
    pub probed_count: usize,

    /// Whether the fallback crawler had to run
    pub fallback_used: bool,
}

/// Run the full discovery sequence for one site.
///
/// Sitemap resolution and core-path probing always run; the fallback
/// crawler runs only when they produce fewer than
/// `config.min_before_fallback` pages. A crawler error (browser failed to
/// start, invalid root) is surfaced to the caller; everything softer is
/// logged and skipped.
pub async fn discover_site(
    fetcher: Arc<dyn PageFetcher>,
    fallback: &dyn Crawler,
    config: &DiscoverConfig,
    language: &str,
) -> CrawlResult<DiscoveryOutcome> {
    let root = Url::parse(&config.root_url).map_err(|_| CrawlError::InvalidUrl {
        url: config.root_url.clone(),
    })?;

    // Strategy 1: sitemaps.
    let resolver =
        SitemapResolver::new(fetcher.clone()).with_max_fetches(config.max_sitemap_fetches);
    let sitemap_urls = resolver.resolve(&root).await;
    let sitemap_pages: Vec<DiscoveredPage> = sitemap_urls
        .iter()
        .filter_map(|raw| {
            let mut url = Url::parse(raw).ok()?;
            url.set_fragment(None);
            Some(DiscoveredPage::new(url.as_str(), PageOrigin::Sitemap))
        })
        .collect();
    let sitemap_count = sitemap_pages.len();

    // Strategy 2: core-path probing, skipping URLs the sitemap already gave us.
    let known: IndexMap<String, DiscoveredPage> = sitemap_pages
        .iter()
        .map(|p| (p.url.clone(), p.clone()))
        .collect();
    let prober = CorePageProber::new(fetcher.clone()).with_concurrency(config.probe_concurrency);
    let probed = prober.probe(&root, language, &known).await;
    let probed_count = probed.len();

    let mut pages = aggregate::merge(probed, sitemap_pages, Vec::new());

    // Strategy 3: fallback crawl, only when the site is under-discovered.
    let mut fallback_used = false;
    if pages.len() < config.min_before_fallback {
        info!(
            discovered = pages.len(),
            threshold = config.min_before_fallback,
            "Under threshold, running fallback crawl"
        );
        fallback_used = true;
        for page in fallback.crawl(config).await? {
            aggregate::merge_page(&mut pages, page);
        }
    }

    enrich_titles(fetcher, &mut pages, config).await;

    info!(
        root = %root,
        total = pages.len(),
        sitemap_count,
        probed_count,
        fallback_used,
        "Discovery finished"
    );

    Ok(DiscoveryOutcome {
        pages,
        sitemap_count,
        probed_count,
        fallback_used,
    })
}

/// Fetch titles (and cache bodies) for a bounded number of
/// sitemap-discovered pages that have neither.
async fn enrich_titles(
    fetcher: Arc<dyn PageFetcher>,
    pages: &mut IndexMap<String, DiscoveredPage>,
    config: &DiscoverConfig,
) {
    let targets: Vec<String> = pages
        .values()
        .filter(|p| p.origin == PageOrigin::Sitemap && p.title.is_none() && p.html.is_none())
        .map(|p| p.url.clone())
        .take(config.title_fetch_limit)
        .collect();

    if targets.is_empty() {
        return;
    }

    let skipped = pages
        .values()
        .filter(|p| p.origin == PageOrigin::Sitemap && p.title.is_none() && p.html.is_none())
        .count()
        .saturating_sub(targets.len());
    if skipped > 0 {
        warn!(skipped, limit = config.title_fetch_limit, "Title enrichment truncated");
    }

    let fetched: Vec<Option<(String, Option<String>, String)>> = stream::iter(targets)
        .map(|raw_url| {
            let fetcher = fetcher.clone();
            async move {
                let url = Url::parse(&raw_url).ok()?;
                let response = fetcher.get(&url).await.ok()?;
                if !response.is_success() || !response.is_html() {
                    return None;
                }
                let title = extract_title(&response.body);
                Some((raw_url, title, response.body))
            }
        })
        .buffer_unordered(config.probe_concurrency)
        .collect()
        .await;

    let mut enriched: HashSet<String> = HashSet::new();
    for (url, title, body) in fetched.into_iter().flatten() {
        if let Some(page) = pages.get_mut(&url) {
            if page.title.is_none() {
                page.title = title;
            }
            if page.html.is_none() {
                page.html = Some(body);
            }
            enriched.insert(url);
        }
    }
    info!(enriched = enriched.len(), "Sitemap title enrichment finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCrawler, MockFetcher};

    const ROOT: &str = "https://example.test/";

    fn sitemap_with(locs: &[&str]) -> MockFetcher {
        let entries: String = locs
            .iter()
            .map(|l| format!("<url><loc>{l}</loc></url>"))
            .collect();
        MockFetcher::new().with_response(
            "https://example.test/sitemap.xml",
            200,
            "application/xml",
            &format!(
                r#"<?xml version="1.0"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
            ),
        )
    }

    fn config() -> DiscoverConfig {
        DiscoverConfig::new(ROOT)
            .with_rate_limit_ms(0)
            .with_min_before_fallback(3)
    }

    #[tokio::test]
    async fn fallback_runs_only_when_under_threshold() {
        // Sitemap yields one page; threshold is 3, so the fallback runs.
        let fetcher = Arc::new(sitemap_with(&["https://example.test/only"]));
        let crawler = MockCrawler::new()
            .with_page(DiscoveredPage::new(
                "https://example.test/crawled",
                PageOrigin::FallbackCrawl,
            ))
            .with_page(DiscoveredPage::new(
                "https://example.test/only",
                PageOrigin::FallbackCrawl,
            ));

        let outcome = discover_site(fetcher, &crawler, &config(), "english")
            .await
            .unwrap();

        assert!(outcome.fallback_used);
        assert_eq!(crawler.call_count(), 1);
        assert_eq!(outcome.pages.len(), 2); // "only" deduplicated
        assert_eq!(
            outcome.pages["https://example.test/only"].origin,
            PageOrigin::Sitemap
        );
    }

    #[tokio::test]
    async fn fallback_skipped_at_threshold() {
        let fetcher = Arc::new(sitemap_with(&[
            "https://example.test/a",
            "https://example.test/b",
            "https://example.test/c",
        ]));
        let crawler = MockCrawler::new();

        let outcome = discover_site(fetcher, &crawler, &config(), "english")
            .await
            .unwrap();

        assert!(!outcome.fallback_used);
        assert_eq!(crawler.call_count(), 0);
        assert_eq!(outcome.pages.len(), 3);
    }

    #[tokio::test]
    async fn probe_confirmations_join_the_map() {
        let fetcher = Arc::new(
            sitemap_with(&[
                "https://example.test/a",
                "https://example.test/b",
                "https://example.test/c",
            ])
            .with_html_page("https://example.test/about", "<title>About</title>"),
        );
        let crawler = MockCrawler::new();

        let outcome = discover_site(fetcher, &crawler, &config(), "english")
            .await
            .unwrap();

        let about = &outcome.pages["https://example.test/about"];
        assert_eq!(about.origin, PageOrigin::Probe);
        assert_eq!(about.title.as_deref(), Some("About"));
        assert_eq!(outcome.probed_count, 1);
    }

    #[tokio::test]
    async fn sitemap_pages_get_title_enrichment() {
        let fetcher = Arc::new(
            sitemap_with(&[
                "https://example.test/a",
                "https://example.test/b",
                "https://example.test/c",
            ])
            .with_html_page("https://example.test/a", "<title>Page A</title>"),
        );
        let crawler = MockCrawler::new();

        let outcome = discover_site(fetcher, &crawler, &config(), "english")
            .await
            .unwrap();

        let a = &outcome.pages["https://example.test/a"];
        assert_eq!(a.title.as_deref(), Some("Page A"));
        assert!(a.html.is_some());
    }

    #[tokio::test]
    async fn invalid_root_is_an_error() {
        let fetcher = Arc::new(MockFetcher::new());
        let crawler = MockCrawler::new();
        let result = discover_site(
            fetcher,
            &crawler,
            &DiscoverConfig::new("not-a-url"),
            "english",
        )
        .await;
        assert!(matches!(result, Err(CrawlError::InvalidUrl { .. })));
    }
}
