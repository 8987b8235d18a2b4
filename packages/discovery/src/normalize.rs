//! URL canonicalization and same-origin membership.
//!
//! Every other discovery component funnels candidate URLs through these
//! helpers before comparing or enqueuing them.

use url::Url;

/// Resolve `href` against `base` into a canonical absolute URL.
///
/// Strips the fragment, rejects non-HTTP(S) schemes, and drops references
/// that are not navigable pages (`javascript:`, `mailto:`, `tel:`, bare
/// anchors). The `url` crate lower-cases the host during parsing.
///
/// Returns `None` for anything that cannot become a crawlable URL.
pub fn normalize(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
    {
        return None;
    }

    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);

    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.host_str()?;

    Some(resolved)
}

/// Like [`normalize`], but also strips the query string.
///
/// Crawl frontiers key their visited-set on this form so that
/// `/page?utm=...` variants collapse to one entry.
pub fn normalize_for_crawl(base: &Url, href: &str) -> Option<Url> {
    let mut resolved = normalize(base, href)?;
    resolved.set_query(None);
    Some(resolved)
}

/// Whether two URLs share an origin for crawl purposes.
///
/// Hosts are compared exactly: `blog.example.com` is NOT the same origin as
/// `example.com`. Ports are not considered.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => ha == hb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://example.com/docs/").unwrap()
    }

    #[test]
    fn resolves_relative_references() {
        let url = normalize(&base(), "guide").unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/guide");

        let url = normalize(&base(), "/about").unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn strips_fragment() {
        let url = normalize(&base(), "/page#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn crawl_form_strips_query() {
        let url = normalize_for_crawl(&base(), "/page?utm_source=mail#top").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn rejects_non_navigable_references() {
        assert!(normalize(&base(), "#top").is_none());
        assert!(normalize(&base(), "javascript:void(0)").is_none());
        assert!(normalize(&base(), "mailto:hi@example.com").is_none());
        assert!(normalize(&base(), "tel:+15551234").is_none());
        assert!(normalize(&base(), "ftp://example.com/file").is_none());
    }

    #[test]
    fn lower_cases_host() {
        let url = normalize(&base(), "https://EXAMPLE.com/Path").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        // Path case is preserved
        assert_eq!(url.path(), "/Path");
    }

    #[test]
    fn same_origin_is_exact_host_match() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("http://example.com/b?q=1").unwrap();
        let sub = Url::parse("https://blog.example.com/").unwrap();
        let other = Url::parse("https://other.com/").unwrap();

        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &sub));
        assert!(!same_origin(&a, &other));
    }

    #[test]
    fn normalize_is_idempotent() {
        for href in ["/page#frag", "guide?q=1", "https://Example.COM/X#y"] {
            let once = normalize(&base(), href).unwrap();
            let twice = normalize(&once, once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    proptest! {
        #[test]
        fn normalize_idempotent_for_arbitrary_paths(path in "[a-z0-9/._-]{0,40}", frag in "[a-z0-9]{0,8}") {
            let href = format!("/{path}#{frag}");
            if let Some(once) = normalize(&base(), &href) {
                let twice = normalize(&once, once.as_str()).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
