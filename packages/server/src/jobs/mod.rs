//! Job model for knowledge base generation runs.
//!
//! A job walks a one-directional state machine:
//! `pending → discovering → selecting → extracting → compiling` and then
//! one of the terminals, `completed` or `failed`. Every record is owned by
//! the [`registry::JobRegistry`] and mutated only by the worker assigned to
//! it, while status pollers read cloned snapshots.

pub mod registry;
pub mod runner;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::ai::{SelectedPage, TokenUsage};

/// How many characters of the final document a running job exposes.
const RESULT_PREVIEW_CHARS: usize = 1_000;

/// Job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Discovering,
    Selecting,
    Extracting,
    Compiling,
    Completed,
    Failed,
}

impl JobStatus {
    /// Position in the partial order; both terminals share the top rank.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Discovering => 1,
            JobStatus::Selecting => 2,
            JobStatus::Extracting => 3,
            JobStatus::Compiling => 4,
            JobStatus::Completed | JobStatus::Failed => 5,
        }
    }

    /// Whether the job can never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Which fallback crawler a job was asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlerKind {
    Http,
    Browser,
}

/// Per-page outcome of the extraction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Pending,
    Extracted,
    Failed,
}

/// Status record for one selected page during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub url: String,
    pub title: Option<String>,
    pub status: ExtractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// First part of the extracted chunk, for status polling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl ExtractionRecord {
    /// A record for a page whose extraction has not finished yet.
    pub fn pending(page: &SelectedPage) -> Self {
        Self {
            url: page.url.clone(),
            title: page.title.clone(),
            status: ExtractionStatus::Pending,
            error: None,
            preview: None,
        }
    }
}

/// A short url+title+origin summary of a discovered page.
///
/// The full `DiscoveredPage` records (with cached HTML) stay in the worker;
/// the registry only ever holds these, so status polls never serialize page
/// bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredSummary {
    pub url: String,
    pub title: Option<String>,
    pub origin: discovery::PageOrigin,
}

/// One knowledge base generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub url: String,
    pub crawler: CrawlerKind,
    pub max_pages: usize,

    pub status: JobStatus,
    /// Short human-readable phrase describing the current step
    pub progress: String,
    pub language: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,

    pub discovered_pages: Vec<DiscoveredSummary>,
    pub selected_pages: Vec<SelectedPage>,
    pub extractions: Vec<ExtractionRecord>,
    pub chunk_count: usize,

    pub final_knowledge_base: Option<String>,
    pub error: Option<String>,

    pub usage: TokenUsage,
    pub estimated_cost_usd: Decimal,
}

impl Job {
    /// Create a pending job.
    pub fn new(url: impl Into<String>, max_pages: usize, crawler: CrawlerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            crawler,
            max_pages,
            status: JobStatus::Pending,
            progress: "Job accepted, pending start.".to_string(),
            language: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            discovered_pages: Vec::new(),
            selected_pages: Vec::new(),
            extractions: Vec::new(),
            chunk_count: 0,
            final_knowledge_base: None,
            error: None,
            usage: TokenUsage::default(),
            estimated_cost_usd: Decimal::ZERO,
        }
    }

    /// Move to a later state; transitions never go backwards and terminal
    /// states never change.
    pub fn advance(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || status.rank() < self.status.rank() {
            warn!(
                job_id = %self.id,
                from = ?self.status,
                to = ?status,
                "Refusing backwards job transition"
            );
            return false;
        }
        self.status = status;
        true
    }
}

/// Full job view handed to status pollers.
///
/// While the job is running only a bounded preview of the in-progress
/// document is exposed; the full text appears once `status == completed`.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: Uuid,
    pub url: String,
    pub crawler: CrawlerKind,
    pub max_pages: usize,
    pub status: JobStatus,
    pub progress: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,

    pub discovered_pages_count: usize,
    pub discovered_pages: Vec<DiscoveredSummary>,
    pub selected_pages_count: usize,
    pub selected_pages: Vec<SelectedPage>,
    pub extractions: Vec<ExtractionRecord>,
    pub extracted_chunks_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_knowledge_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_knowledge_base_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub estimated_cost_usd: Decimal,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        let duration_seconds = match (job.started_at, job.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        };

        let (full, preview) = match (&job.final_knowledge_base, job.status) {
            (Some(kb), JobStatus::Completed) => {
                (Some(kb.clone()), Some(preview_of(kb)))
            }
            (Some(kb), _) => (None, Some(preview_of(kb))),
            (None, _) => (None, None),
        };

        Self {
            id: job.id,
            url: job.url,
            crawler: job.crawler,
            max_pages: job.max_pages,
            status: job.status,
            progress: job.progress,
            language: job.language,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            duration_seconds,
            discovered_pages_count: job.discovered_pages.len(),
            discovered_pages: job.discovered_pages,
            selected_pages_count: job.selected_pages.len(),
            selected_pages: job.selected_pages,
            extractions: job.extractions,
            extracted_chunks_count: job.chunk_count,
            final_knowledge_base: full,
            final_knowledge_base_preview: preview,
            error: job.error,
            total_prompt_tokens: job.usage.prompt_tokens,
            total_completion_tokens: job.usage.completion_tokens,
            estimated_cost_usd: job.estimated_cost_usd,
        }
    }
}

/// Condensed job line for listings.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub url: String,
    pub status: JobStatus,
    pub progress: String,
    pub crawler: CrawlerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub estimated_cost_usd: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            url: job.url.clone(),
            status: job.status,
            progress: job.progress.clone(),
            crawler: job.crawler,
            language: job.language.clone(),
            created_at: job.created_at,
            finished_at: job.finished_at,
            total_prompt_tokens: job.usage.prompt_tokens,
            total_completion_tokens: job.usage.completion_tokens,
            estimated_cost_usd: job.estimated_cost_usd,
            error: job.error.clone(),
        }
    }
}

fn preview_of(text: &str) -> String {
    if text.chars().count() <= RESULT_PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(RESULT_PREVIEW_CHARS).collect();
        format!("{head}\n... (content truncated in status preview)")
    }
}
