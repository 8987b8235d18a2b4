//! Site Page Discovery Library
//!
//! Finds the set of pages worth reading on an unknown website by combining
//! three independent strategies and merging their results:
//!
//! - **Sitemap resolution** - robots.txt `Sitemap:` directives plus the
//!   conventional `/sitemap.xml` locations, expanded through nested sitemap
//!   indexes.
//! - **Core-page probing** - a curated, language-aware vocabulary of
//!   conventional path slugs (`/about`, `/contact`, ...) confirmed with
//!   lightweight existence checks.
//! - **Fallback crawling** - breadth-first traversal of same-origin links,
//!   either plain HTTP or through a headless browser for script-heavy sites,
//!   used only when the other strategies under-populate the page set.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use discovery::{discover_site, DiscoverConfig, HttpCrawler, HttpFetcher};
//!
//! let fetcher = Arc::new(HttpFetcher::new());
//! let crawler = HttpCrawler::new(fetcher.clone());
//! let config = DiscoverConfig::new("https://example.com").with_page_budget(30);
//! let outcome = discover_site(fetcher, &crawler, &config, "english").await?;
//! ```

pub mod aggregate;
pub mod crawlers;
pub mod error;
pub mod fetcher;
pub mod html;
pub mod normalize;
pub mod pipeline;
pub mod prober;
pub mod sitemap;
pub mod testing;
pub mod types;

pub use aggregate::{merge, merge_page};
pub use crawlers::{browser::BrowserCrawler, http::HttpCrawler, Crawler, Frontier};
pub use error::{CrawlError, CrawlResult};
pub use fetcher::{FetchedPage, HttpFetcher, PageFetcher};
pub use normalize::{normalize, normalize_for_crawl, same_origin};
pub use pipeline::{discover_site, DiscoveryOutcome};
pub use prober::CorePageProber;
pub use sitemap::SitemapResolver;
pub use types::{DiscoverConfig, DiscoveredPage, PageOrigin};
