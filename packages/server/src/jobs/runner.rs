//! The per-job pipeline worker.
//!
//! Drives discovery → selection → extraction → compilation for one job,
//! writing every stage transition and per-page outcome into the registry
//! under its lock. Admission is bounded: a semaphore caps how many jobs
//! run at once and the number waiting for a permit is observable.

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use discovery::{merge_page, DiscoverConfig};

use crate::ai::{Analyst, AnalystError, KnowledgeChunk, PageListing, TokenUsage, DEFAULT_LANGUAGE};
use crate::config::AppConfig;
use crate::discover::SiteDiscoverer;
use crate::jobs::registry::JobRegistry;
use crate::jobs::{DiscoveredSummary, ExtractionRecord, ExtractionStatus, JobStatus};

/// Per-job inputs taken from the create request.
#[derive(Debug, Clone)]
pub struct JobParams {
    pub url: String,
    pub max_pages: usize,
    pub use_browser: bool,
}

/// Runner limits and pricing, derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub max_concurrent_jobs: usize,
    pub min_before_fallback: usize,
    pub fallback_page_budget: usize,
    pub input_price_per_million: Decimal,
    pub output_price_per_million: Decimal,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self::from(&app)
    }
}

impl From<&AppConfig> for RunnerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs.max(1),
            min_before_fallback: config.min_before_fallback,
            fallback_page_budget: config.fallback_page_budget,
            input_price_per_million: config.input_price_per_million,
            output_price_per_million: config.output_price_per_million,
        }
    }
}

/// Spawns and executes knowledge base jobs.
pub struct JobRunner {
    registry: Arc<JobRegistry>,
    analyst: Arc<dyn Analyst>,
    discoverer: Arc<dyn SiteDiscoverer>,
    limiter: Arc<Semaphore>,
    waiting: AtomicUsize,
    config: RunnerConfig,
}

impl JobRunner {
    /// Create a runner over the given collaborators.
    pub fn new(
        registry: Arc<JobRegistry>,
        analyst: Arc<dyn Analyst>,
        discoverer: Arc<dyn SiteDiscoverer>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            registry,
            analyst,
            discoverer,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            waiting: AtomicUsize::new(0),
            config,
        }
    }

    /// Jobs currently waiting for an execution permit.
    pub fn queue_depth(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Run a job in the background.
    pub fn spawn(self: &Arc<Self>, job_id: Uuid, params: JobParams) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.execute(job_id, params).await })
    }

    /// Run a job to its terminal state, honoring the admission limit.
    pub async fn execute(&self, job_id: Uuid, params: JobParams) {
        self.waiting.fetch_add(1, Ordering::Relaxed);
        let permit = self.limiter.acquire().await;
        self.waiting.fetch_sub(1, Ordering::Relaxed);
        let _permit = match permit {
            Ok(permit) => permit,
            Err(_) => return, // semaphore closed: process shutting down
        };

        info!(job_id = %job_id, url = %params.url, use_browser = params.use_browser, "Job starting");

        let mut usage = TokenUsage::default();
        let outcome = self.run(job_id, &params, &mut usage).await;
        let cost = self.estimate_cost(&usage);

        self.registry.update(job_id, |job| {
            job.usage = usage;
            job.estimated_cost_usd = cost;
            job.finished_at = Some(Utc::now());
            match &outcome {
                Ok(document) => {
                    job.final_knowledge_base = Some(document.clone());
                    job.error = None;
                    job.advance(JobStatus::Completed);
                    job.progress = "Job finished.".to_string();
                }
                Err(message) => {
                    job.error = Some(message.clone());
                    job.advance(JobStatus::Failed);
                    job.progress = "Job failed.".to_string();
                }
            }
        });

        match outcome {
            Ok(_) => info!(
                job_id = %job_id,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                cost = %cost,
                "Job completed"
            ),
            Err(message) => error!(job_id = %job_id, error = %message, "Job failed"),
        }
    }

    /// The pipeline proper. Returns the compiled document, or the
    /// human-readable failure message for the terminal record.
    async fn run(
        &self,
        job_id: Uuid,
        params: &JobParams,
        usage: &mut TokenUsage,
    ) -> Result<String, String> {
        let config = DiscoverConfig::new(&params.url)
            .with_page_budget(self.config.fallback_page_budget)
            .with_min_before_fallback(self.config.min_before_fallback);

        // Stage: discovering
        self.registry.update(job_id, |job| {
            job.advance(JobStatus::Discovering);
            job.started_at = Some(Utc::now());
            job.progress = "Fetching root page...".to_string();
        });

        let seed = self.discoverer.fetch_root(&config).await;

        // Language detection from the root page; failures fall back to the
        // default rather than killing the job.
        let language = match seed.as_ref().and_then(|page| page.html.as_deref()) {
            Some(html) => match self.analyst.detect_language(html, &params.url).await {
                Ok((language, call_usage)) => {
                    usage.add(call_usage);
                    self.sync_usage(job_id, usage);
                    language
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Language detection failed, defaulting");
                    DEFAULT_LANGUAGE.to_string()
                }
            },
            None => DEFAULT_LANGUAGE.to_string(),
        };

        self.registry.update(job_id, |job| {
            job.language = Some(language.clone());
            job.progress = "Discovering pages (sitemap, probe)...".to_string();
        });

        let mut discovered = self
            .discoverer
            .discover(&config, &language, params.use_browser)
            .await
            .map_err(|e| format!("Discovery failed: {e}"))?;
        if let Some(seed) = seed {
            merge_page(&mut discovered.pages, seed);
        }

        if discovered.pages.is_empty() {
            return Err("no pages discovered.".to_string());
        }

        let listings: Vec<PageListing> = discovered
            .pages
            .values()
            .map(|page| PageListing {
                url: page.url.clone(),
                title: page.title.clone(),
            })
            .collect();

        // Stage: selecting
        self.registry.update(job_id, |job| {
            job.discovered_pages = discovered
                .pages
                .values()
                .map(|page| DiscoveredSummary {
                    url: page.url.clone(),
                    title: page.title.clone(),
                    origin: page.origin,
                })
                .collect();
            job.advance(JobStatus::Selecting);
            job.progress = format!("AI selecting from {} pages...", listings.len());
        });

        let (selected, call_usage) = self
            .analyst
            .select_pages(&listings, &params.url, params.max_pages, &language)
            .await
            .map_err(|e| format!("Page selection failed: {e}"))?;
        usage.add(call_usage);
        self.sync_usage(job_id, usage);

        if selected.is_empty() {
            return Err("AI selected no relevant pages.".to_string());
        }

        // Stage: extracting
        self.registry.update(job_id, |job| {
            job.selected_pages = selected.clone();
            job.advance(JobStatus::Extracting);
        });

        let mut chunks: Vec<KnowledgeChunk> = Vec::new();
        for (index, page) in selected.iter().enumerate() {
            self.registry.update(job_id, |job| {
                job.progress = format!(
                    "Extracting page {}/{}: {}",
                    index + 1,
                    selected.len(),
                    page.url
                );
                job.extractions.push(ExtractionRecord::pending(page));
            });

            let html = match discovered
                .pages
                .get(&page.url)
                .and_then(|cached| cached.html.clone())
            {
                Some(html) => Ok(html),
                None => self
                    .discoverer
                    .fetch_page(&page.url)
                    .await
                    .map(|fetched| fetched.html.unwrap_or_default())
                    .map_err(|e| format!("fetch failed: {e}")),
            };

            let extraction = match html {
                Ok(html) if !html.trim().is_empty() => self
                    .analyst
                    .extract_page(&html, &page.url, page.title.as_deref(), &language)
                    .await
                    .map_err(|e| e.to_string()),
                Ok(_) => Err("page body was empty".to_string()),
                Err(e) => Err(e),
            };

            // Per-page failures are recorded and skipped; only a total
            // wipeout fails the job.
            match extraction {
                Ok((chunk, call_usage)) => {
                    usage.add(call_usage);
                    let preview: String = chunk.content.chars().take(200).collect();
                    let chunk_count = chunks.len() + 1;
                    let snapshot = *usage;
                    self.registry.update(job_id, |job| {
                        job.usage = snapshot;
                        job.chunk_count = chunk_count;
                        if let Some(record) = pending_record(&mut job.extractions, &page.url) {
                            record.status = ExtractionStatus::Extracted;
                            record.title = Some(chunk.title.clone());
                            record.preview = Some(preview.clone());
                        }
                    });
                    chunks.push(chunk);
                }
                Err(message) => {
                    warn!(job_id = %job_id, url = %page.url, error = %message, "Page extraction failed");
                    self.registry.update(job_id, |job| {
                        if let Some(record) = pending_record(&mut job.extractions, &page.url) {
                            record.status = ExtractionStatus::Failed;
                            record.error = Some(message.clone());
                        }
                    });
                }
            }
        }

        if chunks.is_empty() {
            return Err("failed to extract content from any selected page.".to_string());
        }

        // Stage: compiling
        self.registry.update(job_id, |job| {
            job.advance(JobStatus::Compiling);
            job.progress = format!("AI compiling {} chunks...", chunks.len());
        });

        match self.analyst.compile(&chunks, &params.url, &language).await {
            Ok((document, call_usage)) => {
                usage.add(call_usage);
                Ok(document)
            }
            // An over-long compilation degrades to placeholder content;
            // the job still completes.
            Err(AnalystError::ContextLength) => Ok(format!(
                "Error: could not compile the knowledge base in {language}: \
                 combined content was too large for the model."
            )),
            Err(e) => Err(format!("Knowledge base compilation failed: {e}")),
        }
    }

    fn sync_usage(&self, job_id: Uuid, usage: &TokenUsage) {
        let snapshot = *usage;
        self.registry.update(job_id, |job| job.usage = snapshot);
    }

    /// `(prompt / 1M) * input_price + (completion / 1M) * output_price`.
    fn estimate_cost(&self, usage: &TokenUsage) -> Decimal {
        let million = Decimal::from(1_000_000u64);
        let input = Decimal::from(usage.prompt_tokens) / million * self.config.input_price_per_million;
        let output =
            Decimal::from(usage.completion_tokens) / million * self.config.output_price_per_million;
        input + output
    }
}

fn pending_record<'a>(
    records: &'a mut [ExtractionRecord],
    url: &str,
) -> Option<&'a mut ExtractionRecord> {
    records
        .iter_mut()
        .find(|record| record.url == url && record.status == ExtractionStatus::Pending)
}
