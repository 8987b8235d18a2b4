//! Minimal HTML scraping helpers shared by the prober and HTTP crawler.

/// Extract the `<title>` text from an HTML document.
pub fn extract_title(html: &str) -> Option<String> {
    let title_pattern = regex::Regex::new(r"(?is)<title[^>]*>(.*?)</title>").ok()?;
    title_pattern
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Extract every `href` attribute value from an HTML document.
///
/// Values are returned raw; callers resolve and filter them through
/// [`crate::normalize`].
pub fn extract_links(html: &str) -> Vec<String> {
    let href_pattern = regex::Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap();

    href_pattern
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title() {
        let html = "<html><head><title> Acme Widgets </title></head></html>";
        assert_eq!(extract_title(html), Some("Acme Widgets".to_string()));
    }

    #[test]
    fn title_is_case_insensitive_and_spans_lines() {
        let html = "<TITLE>Multi\nline</TITLE>";
        assert_eq!(extract_title(html), Some("Multi\nline".to_string()));
    }

    #[test]
    fn missing_or_empty_title_is_none() {
        assert_eq!(extract_title("<html><body>hi</body></html>"), None);
        assert_eq!(extract_title("<title>   </title>"), None);
    }

    #[test]
    fn extracts_hrefs() {
        let html = r##"
            <a href="/about">About</a>
            <a href='https://example.com/contact'>Contact</a>
            <link href="/style.css" rel="stylesheet">
        "##;
        let links = extract_links(html);
        assert!(links.contains(&"/about".to_string()));
        assert!(links.contains(&"https://example.com/contact".to_string()));
        assert!(links.contains(&"/style.css".to_string()));
    }
}
