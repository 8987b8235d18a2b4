//! Core-page probing: confirm conventionally-named pages by path slug.
//!
//! Trades completeness for precision - only a fixed, language-localized
//! vocabulary of slugs is ever tested, so arbitrary core pages cannot be
//! found here, only conventionally-named ones.

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::fetcher::PageFetcher;
use crate::html::extract_title;
use crate::types::{DiscoveredPage, PageOrigin};

/// Conventional path slugs for English-language sites.
pub const ENGLISH_CORE_PATHS: &[&str] = &[
    "about",
    "about-us",
    "company",
    "contact",
    "contact-us",
    "support",
    "help",
    "terms",
    "terms-and-conditions",
    "terms-of-service",
    "legal",
    "privacy",
    "privacy-policy",
    "shipping",
    "shipping-policy",
    "delivery",
    "returns",
    "return-policy",
    "refund-policy",
    "faq",
    "faqs",
    "how-to-order",
    "payment-methods",
    "services",
];

/// Conventional path slugs for Persian-language sites.
pub const PERSIAN_CORE_PATHS: &[&str] = &[
    "درباره-ما",
    "تماس-با-ما",
    "پشتیبانی",
    "راهنما",
    "شرایط",
    "قوانین-و-مقررات",
    "حریم-خصوصی",
    "سیاست-حفظ-حریم-خصوصی",
    "ارسال",
    "نحوه-ارسال",
    "بازگشت-کالا",
    "سوالات-متداول",
    "پرسش-های-متداول",
    "راهنمای-خرید",
    "خدمات",
];

/// Select the slug vocabulary for a detected language.
///
/// Unknown languages fall back to the English list.
pub fn core_paths_for(language: &str) -> &'static [&'static str] {
    match language.to_ascii_lowercase().as_str() {
        "persian" | "farsi" => PERSIAN_CORE_PATHS,
        _ => ENGLISH_CORE_PATHS,
    }
}

/// Probes a curated list of conventional paths against a site.
pub struct CorePageProber {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
}

impl CorePageProber {
    /// Create a prober with the default existence-check concurrency (5).
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            concurrency: 5,
        }
    }

    /// Set how many existence checks run concurrently.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Probe the slug vocabulary for `language` against `root`.
    ///
    /// URLs already present in `known` skip the existence check; when the
    /// known record carries HTML they are skipped entirely, otherwise they
    /// are fetched so the aggregate can backfill content.
    pub async fn probe(
        &self,
        root: &Url,
        language: &str,
        known: &IndexMap<String, DiscoveredPage>,
    ) -> Vec<DiscoveredPage> {
        let slugs = core_paths_for(language);
        info!(root = %root, language, slugs = slugs.len(), "Probing core paths");

        let candidates: Vec<(Url, bool)> = slugs
            .iter()
            .filter_map(|slug| root.join(slug).ok())
            .filter_map(|url| match known.get(url.as_str()) {
                Some(page) if page.html.is_some() => None,
                Some(_) => Some((url, true)),
                None => Some((url, false)),
            })
            .collect();

        let found: Vec<Option<DiscoveredPage>> = stream::iter(candidates)
            .map(|(url, already_known)| {
                let fetcher = self.fetcher.clone();
                async move { probe_one(fetcher, url, already_known).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let pages: Vec<DiscoveredPage> = found.into_iter().flatten().collect();
        info!(root = %root, confirmed = pages.len(), "Core-path probing finished");
        pages
    }
}

/// Existence-check one candidate, then fetch it fully on confirmation.
async fn probe_one(
    fetcher: Arc<dyn PageFetcher>,
    url: Url,
    already_known: bool,
) -> Option<DiscoveredPage> {
    if !already_known {
        match fetcher.head(&url).await {
            Ok(status) if status < 400 => {}
            Ok(status) => {
                debug!(url = %url, status, "Core path absent");
                return None;
            }
            // HEAD unsupported or failed; let the GET below decide.
            Err(e) => debug!(url = %url, error = %e, "HEAD failed, falling back to GET"),
        }
    }

    match fetcher.get(&url).await {
        Ok(response) if response.is_success() && response.is_html() => {
            let mut page =
                DiscoveredPage::new(url.as_str(), PageOrigin::Probe).with_html(response.body.clone());
            if let Some(title) = extract_title(&response.body) {
                page = page.with_title(title);
            }
            debug!(url = %url, "Core path confirmed");
            Some(page)
        }
        Ok(response) => {
            debug!(url = %url, status = response.status, "Core path not a page");
            None
        }
        Err(e) => {
            debug!(url = %url, error = %e, "Core path fetch failed");
            None
        }
    }
}
