//! Testing utilities: mock implementations of the network seams.
//!
//! Useful for exercising discovery logic without real HTTP or browser
//! sessions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use url::Url;

use crate::crawlers::Crawler;
use crate::error::{CrawlError, CrawlResult};
use crate::fetcher::{FetchedPage, PageFetcher};
use crate::types::{DiscoverConfig, DiscoveredPage};

/// A scripted [`PageFetcher`] backed by an in-memory URL table.
#[derive(Default)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, FetchedPage>>>,
    head_unsupported: Arc<RwLock<HashSet<String>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    /// Create an empty mock; every fetch fails until pages are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a 200 `text/html` response.
    pub fn with_html_page(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, "text/html; charset=utf-8", body)
    }

    /// Register an arbitrary response.
    pub fn with_response(self, url: &str, status: u16, content_type: &str, body: &str) -> Self {
        let page = FetchedPage {
            final_url: Url::parse(url).expect("mock URL must parse"),
            status,
            content_type: Some(content_type.to_string()),
            body: body.to_string(),
        };
        self.responses
            .write()
            .unwrap()
            .insert(url.to_string(), page);
        self
    }

    /// Make HEAD requests to this URL fail (server rejects the method).
    pub fn with_head_unsupported(self, url: &str) -> Self {
        self.head_unsupported
            .write()
            .unwrap()
            .insert(url.to_string());
        self
    }

    /// A handle sharing this mock's state, for asserting after a move.
    pub fn clone_handle(&self) -> Self {
        Self {
            responses: self.responses.clone(),
            head_unsupported: self.head_unsupported.clone(),
            requests: self.requests.clone(),
        }
    }

    /// Every URL requested so far, GET and HEAD alike.
    pub fn requests(&self) -> Vec<String> {
        self.requests.read().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn get(&self, url: &Url) -> CrawlResult<FetchedPage> {
        self.requests.write().unwrap().push(url.to_string());
        self.responses
            .read()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| {
                CrawlError::Http(Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no mock response for {url}"),
                )))
            })
    }

    async fn head(&self, url: &Url) -> CrawlResult<u16> {
        self.requests.write().unwrap().push(url.to_string());
        if self.head_unsupported.read().unwrap().contains(url.as_str()) {
            return Err(CrawlError::Http(Box::new(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "HEAD rejected",
            ))));
        }
        Ok(self
            .responses
            .read()
            .unwrap()
            .get(url.as_str())
            .map(|p| p.status)
            .unwrap_or(404))
    }
}

/// A scripted [`Crawler`] returning predefined pages.
#[derive(Default)]
pub struct MockCrawler {
    pages: Vec<DiscoveredPage>,
    calls: Arc<RwLock<usize>>,
}

impl MockCrawler {
    /// Create a crawler that returns nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page to the scripted result.
    pub fn with_page(mut self, page: DiscoveredPage) -> Self {
        self.pages.push(page);
        self
    }

    /// How many times `crawl` was invoked.
    pub fn call_count(&self) -> usize {
        *self.calls.read().unwrap()
    }

    /// A handle sharing this mock's call counter.
    pub fn share_calls(&self) -> Arc<RwLock<usize>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Crawler for MockCrawler {
    async fn crawl(&self, config: &DiscoverConfig) -> CrawlResult<Vec<DiscoveredPage>> {
        *self.calls.write().unwrap() += 1;
        Ok(self
            .pages
            .iter()
            .take(config.page_budget)
            .cloned()
            .collect())
    }
}
