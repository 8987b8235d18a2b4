//! Mock analyst and discoverer for exercising the job pipeline without
//! network or model calls.

use async_trait::async_trait;
use std::collections::HashSet;
use std::time::Duration;

use discovery::{
    merge_page, CrawlError, CrawlResult, DiscoverConfig, DiscoveredPage, DiscoveryOutcome,
    PageOrigin,
};
use indexmap::IndexMap;

use crate::ai::{
    Analyst, AnalystError, AnalystResult, KnowledgeChunk, PageListing, SelectedPage, TokenUsage,
    DEFAULT_LANGUAGE,
};
use crate::discover::SiteDiscoverer;

/// How the mock analyst's compile step behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileBehavior {
    /// Return a small compiled document
    #[default]
    Succeed,
    /// Fail with [`AnalystError::ContextLength`]
    ContextLength,
    /// Fail with an API error
    Error,
}

/// A deterministic [`Analyst`] with scriptable behavior.
#[derive(Default)]
pub struct MockAnalyst {
    language: Option<String>,
    selections: Option<Vec<SelectedPage>>,
    select_none: bool,
    failing_extractions: HashSet<String>,
    compile_behavior: CompileBehavior,
}

impl MockAnalyst {
    /// An analyst that detects English, selects everything offered (up to
    /// budget), extracts every page, and compiles successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the detected language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Script the exact selection result.
    pub fn with_selection(mut self, pages: Vec<SelectedPage>) -> Self {
        self.selections = Some(pages);
        self
    }

    /// Make the selection step return nothing.
    pub fn selecting_none(mut self) -> Self {
        self.select_none = true;
        self
    }

    /// Make extraction fail for one URL.
    pub fn failing_extraction(mut self, url: impl Into<String>) -> Self {
        self.failing_extractions.insert(url.into());
        self
    }

    /// Script the compile step.
    pub fn with_compile_behavior(mut self, behavior: CompileBehavior) -> Self {
        self.compile_behavior = behavior;
        self
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn detect_language(
        &self,
        _html_snippet: &str,
        _url: &str,
    ) -> AnalystResult<(String, TokenUsage)> {
        Ok((
            self.language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            TokenUsage::new(20, 2),
        ))
    }

    async fn select_pages(
        &self,
        pages: &[PageListing],
        _root_url: &str,
        budget: usize,
        _language: &str,
    ) -> AnalystResult<(Vec<SelectedPage>, TokenUsage)> {
        if self.select_none {
            return Ok((Vec::new(), TokenUsage::new(50, 5)));
        }
        let selected = match &self.selections {
            Some(selections) => selections.clone(),
            None => pages
                .iter()
                .take(budget)
                .map(|listing| SelectedPage {
                    url: listing.url.clone(),
                    title: listing.title.clone(),
                    reason: Some("foundational".to_string()),
                })
                .collect(),
        };
        Ok((selected, TokenUsage::new(50, 15)))
    }

    async fn extract_page(
        &self,
        _html: &str,
        url: &str,
        title: Option<&str>,
        _language: &str,
    ) -> AnalystResult<(KnowledgeChunk, TokenUsage)> {
        if self.failing_extractions.contains(url) {
            return Err(AnalystError::Schema {
                detail: format!("scripted failure for {url}"),
            });
        }
        Ok((
            KnowledgeChunk {
                url: url.to_string(),
                title: title.unwrap_or("Untitled").to_string(),
                content: format!("Knowledge from {url}."),
            },
            TokenUsage::new(200, 80),
        ))
    }

    async fn compile(
        &self,
        chunks: &[KnowledgeChunk],
        root_url: &str,
        _language: &str,
    ) -> AnalystResult<(String, TokenUsage)> {
        match self.compile_behavior {
            CompileBehavior::Succeed => {
                let body: String = chunks
                    .iter()
                    .map(|chunk| format!("# {}\n\n{}\n\n", chunk.title, chunk.content))
                    .collect();
                Ok((
                    format!("Knowledge base for {root_url}\n\n{body}"),
                    TokenUsage::new(300, 150),
                ))
            }
            CompileBehavior::ContextLength => Err(AnalystError::ContextLength),
            CompileBehavior::Error => Err(AnalystError::Api {
                status: 500,
                message: "scripted compile failure".to_string(),
            }),
        }
    }
}

/// A scripted [`SiteDiscoverer`].
#[derive(Default)]
pub struct MockDiscoverer {
    pages: Vec<DiscoveredPage>,
    fail_discovery: bool,
    stage_delay: Option<Duration>,
}

impl MockDiscoverer {
    /// A discoverer that finds nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page to the discovery result. The first page added doubles as
    /// the root/seed page.
    pub fn with_page(mut self, page: DiscoveredPage) -> Self {
        self.pages.push(page);
        self
    }

    /// Shorthand: add a page with HTML content.
    pub fn with_html_page(self, url: &str, title: &str) -> Self {
        self.with_page(
            DiscoveredPage::new(url, PageOrigin::Sitemap)
                .with_title(title)
                .with_html(format!("<html><title>{title}</title></html>")),
        )
    }

    /// Make `discover` fail like a browser that would not start.
    pub fn failing(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    /// Sleep this long inside `discover`, so tests can observe
    /// intermediate states.
    pub fn with_stage_delay(mut self, delay: Duration) -> Self {
        self.stage_delay = Some(delay);
        self
    }
}

#[async_trait]
impl SiteDiscoverer for MockDiscoverer {
    async fn fetch_root(&self, _config: &DiscoverConfig) -> Option<DiscoveredPage> {
        self.pages.first().cloned()
    }

    async fn discover(
        &self,
        _config: &DiscoverConfig,
        _language: &str,
        _use_browser: bool,
    ) -> CrawlResult<DiscoveryOutcome> {
        if let Some(delay) = self.stage_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_discovery {
            return Err(CrawlError::Browser("scripted launch failure".to_string()));
        }

        let mut pages: IndexMap<String, DiscoveredPage> = IndexMap::new();
        for page in &self.pages {
            merge_page(&mut pages, page.clone());
        }
        Ok(DiscoveryOutcome {
            sitemap_count: pages.len(),
            probed_count: 0,
            fallback_used: false,
            pages,
        })
    }

    async fn fetch_page(&self, url: &str) -> CrawlResult<DiscoveredPage> {
        match self.pages.iter().find(|page| page.url == url) {
            Some(page) => Ok(page.clone()),
            None => Ok(DiscoveredPage::new(url, PageOrigin::Seed)
                .with_html(format!("<html><body>{url}</body></html>"))),
        }
    }
}
