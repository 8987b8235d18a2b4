//! Merging discovery strategy outputs into one deduplicated page map.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::types::DiscoveredPage;

/// Merge one page into the aggregate map.
///
/// A fresh URL inserts the record as-is; a known URL keeps its existing
/// `origin` and adopts any `html`/`title` it was missing.
pub fn merge_page(pages: &mut IndexMap<String, DiscoveredPage>, page: DiscoveredPage) {
    match pages.entry(page.url.clone()) {
        Entry::Occupied(mut existing) => existing.get_mut().absorb(page),
        Entry::Vacant(slot) => {
            slot.insert(page);
        }
    }
}

/// Merge the three strategy outputs, keyed by normalized URL.
///
/// Sources are folded in priority order - probe first (already confirmed
/// and title-fetched), then sitemap, then fallback crawl - so the highest
/// priority source becomes the first writer for URLs it discovered.
pub fn merge(
    probed: Vec<DiscoveredPage>,
    sitemap: Vec<DiscoveredPage>,
    fallback: Vec<DiscoveredPage>,
) -> IndexMap<String, DiscoveredPage> {
    let mut pages = IndexMap::new();
    for page in probed.into_iter().chain(sitemap).chain(fallback) {
        merge_page(&mut pages, page);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageOrigin;

    fn page(url: &str, origin: PageOrigin) -> DiscoveredPage {
        DiscoveredPage::new(url, origin)
    }

    #[test]
    fn no_two_entries_share_a_url() {
        let merged = merge(
            vec![page("https://a.test/x", PageOrigin::Probe)],
            vec![
                page("https://a.test/x", PageOrigin::Sitemap),
                page("https://a.test/y", PageOrigin::Sitemap),
            ],
            vec![
                page("https://a.test/x", PageOrigin::FallbackCrawl),
                page("https://a.test/y", PageOrigin::FallbackCrawl),
                page("https://a.test/z", PageOrigin::FallbackCrawl),
            ],
        );

        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn first_writer_keeps_origin_in_priority_order() {
        let merged = merge(
            vec![page("https://a.test/x", PageOrigin::Probe)],
            vec![page("https://a.test/x", PageOrigin::Sitemap)],
            vec![page("https://a.test/x", PageOrigin::FallbackCrawl)],
        );

        assert_eq!(merged["https://a.test/x"].origin, PageOrigin::Probe);
    }

    #[test]
    fn later_sources_backfill_missing_content() {
        let merged = merge(
            vec![page("https://a.test/x", PageOrigin::Probe)],
            vec![],
            vec![page("https://a.test/x", PageOrigin::FallbackCrawl)
                .with_title("X")
                .with_html("<html></html>")],
        );

        let record = &merged["https://a.test/x"];
        assert_eq!(record.origin, PageOrigin::Probe);
        assert_eq!(record.title.as_deref(), Some("X"));
        assert!(record.html.is_some());
    }

    #[test]
    fn existing_content_is_never_replaced() {
        let merged = merge(
            vec![page("https://a.test/x", PageOrigin::Probe).with_html("<p>probe</p>")],
            vec![],
            vec![page("https://a.test/x", PageOrigin::FallbackCrawl).with_html("<p>crawl</p>")],
        );

        assert_eq!(
            merged["https://a.test/x"].html.as_deref(),
            Some("<p>probe</p>")
        );
    }
}
