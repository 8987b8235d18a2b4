//! Sitemap resolution: robots.txt directives, conventional locations, and
//! nested sitemap indexes.
//!
//! The resolver never fails outright - every per-sitemap error is swallowed
//! and it returns whatever page URLs it accumulated.

use std::collections::{HashSet, VecDeque};
use std::io::Cursor;
use std::sync::Arc;

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use tracing::{debug, info, warn};
use url::Url;

use crate::fetcher::PageFetcher;

/// Conventional sitemap locations probed even without a robots.txt hint.
const COMMON_SITEMAP_PATHS: [&str; 2] = ["/sitemap.xml", "/sitemap_index.xml"];

/// Resolves the full set of page URLs advertised by a site's sitemaps.
pub struct SitemapResolver {
    fetcher: Arc<dyn PageFetcher>,
    max_fetches: usize,
}

impl SitemapResolver {
    /// Create a resolver with the default fetch cap.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            max_fetches: 50,
        }
    }

    /// Cap the total number of sitemap documents fetched per resolution.
    ///
    /// The seen-set already guards against cycles; this bounds graphs of
    /// many *distinct* nested sitemap URLs.
    pub fn with_max_fetches(mut self, max: usize) -> Self {
        self.max_fetches = max;
        self
    }

    /// Walk robots.txt directives and nested sitemap indexes breadth-first,
    /// returning every page URL found.
    pub async fn resolve(&self, root: &Url) -> HashSet<String> {
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages: HashSet<String> = HashSet::new();

        // robots.txt "Sitemap:" directives
        if let Ok(robots_url) = root.join("/robots.txt") {
            match self.fetcher.get(&robots_url).await {
                Ok(response) if response.is_success() => {
                    for sitemap_url in parse_robots_sitemaps(&response.body) {
                        if seen.insert(sitemap_url.clone()) {
                            debug!(sitemap = %sitemap_url, "Sitemap advertised in robots.txt");
                            queue.push_back(sitemap_url);
                        }
                    }
                }
                Ok(response) => {
                    debug!(status = response.status, "No usable robots.txt");
                }
                Err(e) => {
                    debug!(error = %e, "Could not fetch robots.txt");
                }
            }
        }

        // Conventional locations are always worth a try.
        for path in COMMON_SITEMAP_PATHS {
            if let Ok(url) = root.join(path) {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    queue.push_back(url);
                }
            }
        }

        let mut fetched = 0;
        while let Some(sitemap_url) = queue.pop_front() {
            if fetched >= self.max_fetches {
                warn!(
                    cap = self.max_fetches,
                    remaining = queue.len() + 1,
                    "Sitemap fetch cap reached, abandoning the rest"
                );
                break;
            }
            fetched += 1;

            let parsed = match Url::parse(&sitemap_url) {
                Ok(u) => u,
                Err(_) => continue,
            };
            let response = match self.fetcher.get(&parsed).await {
                Ok(r) if r.is_success() => r,
                Ok(r) => {
                    debug!(sitemap = %sitemap_url, status = r.status, "Sitemap not available");
                    continue;
                }
                Err(e) => {
                    debug!(sitemap = %sitemap_url, error = %e, "Sitemap fetch failed");
                    continue;
                }
            };

            if response.is_xml() || sitemap_url.ends_with(".xml") {
                let (page_urls, nested) = parse_sitemap_xml(response.body.as_bytes());
                for url in nested {
                    if seen.insert(url.clone()) {
                        queue.push_back(url);
                    }
                }
                for url in page_urls {
                    // Some urlsets list further sitemaps as plain <loc> entries.
                    if url.ends_with(".xml") {
                        if seen.insert(url.clone()) {
                            queue.push_back(url);
                        }
                    } else {
                        pages.insert(url);
                    }
                }
            } else if response.is_plain_text() {
                for line in response.body.lines() {
                    let line = line.trim();
                    if line.starts_with("http://") || line.starts_with("https://") {
                        pages.insert(line.to_string());
                    }
                }
            } else {
                debug!(
                    sitemap = %sitemap_url,
                    content_type = ?response.content_type,
                    "Skipping sitemap with unrecognized content type"
                );
            }
        }

        info!(
            root = %root,
            page_urls = pages.len(),
            sitemaps_fetched = fetched,
            "Sitemap resolution finished"
        );
        pages
    }
}

/// Pull `Sitemap: <url>` directives out of a robots.txt body.
///
/// The prefix match is case-insensitive per the de-facto standard.
pub fn parse_robots_sitemaps(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let prefix = line.get(..8)?;
            if prefix.eq_ignore_ascii_case("sitemap:") {
                let url = line[8..].trim();
                (!url.is_empty()).then(|| url.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Parse one sitemap document into (page URLs, nested sitemap URLs).
///
/// `<urlset><url><loc>` entries are pages; `<sitemapindex><sitemap><loc>`
/// entries are nested sitemaps to expand.
pub fn parse_sitemap_xml(xml: &[u8]) -> (Vec<String>, Vec<String>) {
    let mut pages = Vec::new();
    let mut nested = Vec::new();

    for entity in SiteMapReader::new(Cursor::new(xml)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    pages.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    nested.push(url.to_string());
                }
            }
            _ => {}
        }
    }

    (pages, nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    const ROOT: &str = "https://example.test/";

    fn urlset(locs: &[&str]) -> String {
        let entries: String = locs
            .iter()
            .map(|l| format!("<url><loc>{l}</loc></url>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
        )
    }

    fn sitemapindex(locs: &[&str]) -> String {
        let entries: String = locs
            .iter()
            .map(|l| format!("<sitemap><loc>{l}</loc></sitemap>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</sitemapindex>"#
        )
    }

    #[test]
    fn robots_directive_parsing_is_case_insensitive() {
        let robots = "User-agent: *\nDisallow: /admin\nSitemap: https://a.test/s.xml\nSITEMAP:   https://a.test/t.xml\nsitemap:\n";
        assert_eq!(
            parse_robots_sitemaps(robots),
            vec!["https://a.test/s.xml", "https://a.test/t.xml"]
        );
    }

    #[test]
    fn xml_parsing_separates_pages_from_nested_sitemaps() {
        let (pages, nested) = parse_sitemap_xml(urlset(&["https://a.test/p1"]).as_bytes());
        assert_eq!(pages, vec!["https://a.test/p1"]);
        assert!(nested.is_empty());

        let (pages, nested) =
            parse_sitemap_xml(sitemapindex(&["https://a.test/nested.xml"]).as_bytes());
        assert!(pages.is_empty());
        assert_eq!(nested, vec!["https://a.test/nested.xml"]);
    }

    #[tokio::test]
    async fn end_to_end_robots_plus_nested_sitemap() {
        // robots advertises one sitemap with 3 pages and a nested sitemap
        // carrying 2 more: resolve must return exactly 5 unique URLs.
        let fetcher = MockFetcher::new()
            .with_response(
                "https://example.test/robots.txt",
                200,
                "text/plain",
                "Sitemap: https://example.test/sitemap.xml",
            )
            .with_response(
                "https://example.test/sitemap.xml",
                200,
                "application/xml",
                r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.test/a</loc></url>
  <url><loc>https://example.test/b</loc></url>
  <url><loc>https://example.test/c</loc></url>
  <url><loc>https://example.test/extra.xml</loc></url>
</urlset>"#,
            )
            .with_response(
                "https://example.test/extra.xml",
                200,
                "application/xml",
                &urlset(&["https://example.test/d", "https://example.test/e"]),
            );

        let resolver = SitemapResolver::new(Arc::new(fetcher));
        let pages = resolver
            .resolve(&Url::parse(ROOT).unwrap())
            .await;

        assert_eq!(pages.len(), 5);
        for suffix in ["a", "b", "c", "d", "e"] {
            assert!(pages.contains(&format!("https://example.test/{suffix}")));
        }
    }

    #[tokio::test]
    async fn cyclic_sitemap_index_terminates() {
        let fetcher = MockFetcher::new()
            .with_response(
                "https://example.test/sitemap.xml",
                200,
                "application/xml",
                r#"<?xml version="1.0"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.test/b.xml</loc></sitemap>
</sitemapindex>"#,
            )
            .with_response(
                "https://example.test/b.xml",
                200,
                "application/xml",
                r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.test/page-b</loc></url>
  <url><loc>https://example.test/sitemap.xml</loc></url>
</urlset>"#,
            );

        let resolver = SitemapResolver::new(Arc::new(fetcher));
        let pages = resolver
            .resolve(&Url::parse(ROOT).unwrap())
            .await;

        assert!(pages.contains("https://example.test/page-b"));
        // The cycle back to sitemap.xml is ignored by the seen-set; only
        // the real page URL comes out.
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn plain_text_sitemaps_parse_one_url_per_line() {
        let fetcher = MockFetcher::new()
            .with_response(
                "https://example.test/robots.txt",
                200,
                "text/plain",
                "Sitemap: https://example.test/pages.txt",
            )
            .with_response(
                "https://example.test/pages.txt",
                200,
                "text/plain",
                "https://example.test/one\n# comment\nhttps://example.test/two\n",
            );

        let resolver = SitemapResolver::new(Arc::new(fetcher));
        let pages = resolver
            .resolve(&Url::parse(ROOT).unwrap())
            .await;

        assert_eq!(pages.len(), 2);
        assert!(pages.contains("https://example.test/one"));
        assert!(pages.contains("https://example.test/two"));
    }

    #[tokio::test]
    async fn fetch_cap_bounds_pathological_indexes() {
        // Each sitemap points at a fresh one; distinct URLs defeat the
        // seen-set, so only the cap stops the walk.
        let mut fetcher = MockFetcher::new();
        for i in 0..20 {
            fetcher = fetcher.with_response(
                &format!("https://example.test/sm{i}.xml"),
                200,
                "application/xml",
                &sitemapindex(&[&format!("https://example.test/sm{}.xml", i + 1)]),
            );
        }
        fetcher = fetcher.with_response(
            "https://example.test/sitemap.xml",
            200,
            "application/xml",
            &sitemapindex(&["https://example.test/sm0.xml"]),
        );

        let resolver = SitemapResolver::new(Arc::new(fetcher)).with_max_fetches(5);
        let pages = resolver
            .resolve(&Url::parse(ROOT).unwrap())
            .await;

        // Never finds a page, but terminates after the cap.
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn network_failures_are_swallowed() {
        // Nothing resolvable at all: no robots, no sitemaps.
        let resolver = SitemapResolver::new(Arc::new(MockFetcher::new()));
        let pages = resolver
            .resolve(&Url::parse(ROOT).unwrap())
            .await;
        assert!(pages.is_empty());
    }
}
