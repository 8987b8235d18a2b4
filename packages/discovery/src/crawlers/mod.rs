//! Fallback crawler implementations and their shared frontier.

pub mod browser;
pub mod http;

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use url::Url;

use crate::error::CrawlResult;
use crate::normalize::same_origin;
use crate::types::{DiscoverConfig, DiscoveredPage};

/// Contract shared by the HTTP and browser fallback crawlers.
#[async_trait]
pub trait Crawler: Send + Sync {
    /// Breadth-first crawl from the configured root, up to the page budget.
    async fn crawl(&self, config: &DiscoverConfig) -> CrawlResult<Vec<DiscoveredPage>>;
}

/// Per-crawl frontier state: the FIFO of known-but-unvisited URLs.
///
/// A URL enters the queue at most once over the lifetime of the crawl
/// (the seen-set covers visited and queued alike), and only same-origin
/// URLs are accepted. Scoped to a single crawl invocation.
#[derive(Debug)]
pub struct Frontier {
    root: Url,
    queue: VecDeque<Url>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Seed a frontier with the crawl root (fragment and query stripped).
    pub fn new(root: &Url) -> Self {
        let mut seed = root.clone();
        seed.set_fragment(None);
        seed.set_query(None);

        let mut seen = HashSet::new();
        seen.insert(seed.to_string());

        let mut queue = VecDeque::new();
        queue.push_back(seed);

        Self {
            root: root.clone(),
            queue,
            seen,
        }
    }

    /// Offer a candidate URL; accepted only if same-origin and never seen.
    ///
    /// Candidates are expected to already be in crawl-normalized form
    /// (fragment and query stripped).
    pub fn enqueue(&mut self, candidate: Url) -> bool {
        if !same_origin(&candidate, &self.root) {
            return false;
        }
        if !self.seen.insert(candidate.to_string()) {
            return false;
        }
        self.queue.push_back(candidate);
        true
    }

    /// Take the next URL to visit.
    pub fn next(&mut self) -> Option<Url> {
        self.queue.pop_front()
    }

    /// Number of URLs still waiting.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Total distinct URLs ever accepted.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Url {
        Url::parse("https://example.com/?ref=home#top").unwrap()
    }

    #[test]
    fn seed_is_stripped_and_queued() {
        let mut frontier = Frontier::new(&root());
        let first = frontier.next().unwrap();
        assert_eq!(first.as_str(), "https://example.com/");
        assert!(frontier.next().is_none());
    }

    #[test]
    fn rejects_cross_origin() {
        let mut frontier = Frontier::new(&root());
        assert!(!frontier.enqueue(Url::parse("https://other.com/a").unwrap()));
        assert!(!frontier.enqueue(Url::parse("https://blog.example.com/a").unwrap()));
        assert!(frontier.enqueue(Url::parse("https://example.com/a").unwrap()));
    }

    #[test]
    fn url_enters_queue_at_most_once() {
        let mut frontier = Frontier::new(&root());
        let url = Url::parse("https://example.com/a").unwrap();

        assert!(frontier.enqueue(url.clone()));
        assert!(!frontier.enqueue(url.clone()));

        // Still rejected after being dequeued
        frontier.next();
        let dequeued = frontier.next().unwrap();
        assert_eq!(dequeued, url);
        assert!(!frontier.enqueue(url));
    }

    #[test]
    fn every_accepted_url_is_same_origin() {
        let mut frontier = Frontier::new(&root());
        let candidates = [
            "https://example.com/a",
            "https://example.com/b",
            "https://evil.com/x",
            "https://example.com/a", // duplicate
        ];
        for c in candidates {
            frontier.enqueue(Url::parse(c).unwrap());
        }

        let root_url = root();
        while let Some(url) = frontier.next() {
            assert!(same_origin(&url, &root_url));
        }
        assert_eq!(frontier.seen_count(), 3); // seed + a + b
    }
}
