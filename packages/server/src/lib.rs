//! Knowledge base service core.
//!
//! Wires the `discovery` crate to an AI analyst and exposes the whole
//! pipeline - discover pages, select the important ones, extract their
//! knowledge, compile one document - as tracked asynchronous jobs behind a
//! small authenticated HTTP API.
//!
//! # Modules
//!
//! - [`config`] - environment-driven application configuration
//! - [`ai`] - the analyst trait (language detection, page selection,
//!   extraction, compilation) and its OpenAI implementation
//! - [`jobs`] - job model, thread-safe registry, and the pipeline runner
//! - [`discover`] - bridge from the job runner to the discovery crate
//! - [`server`] - axum application, routes, and auth middleware
//! - [`testing`] - mock analyst/discoverer for pipeline tests

pub mod ai;
pub mod config;
pub mod discover;
pub mod jobs;
pub mod server;
pub mod testing;

pub use ai::{Analyst, AnalystError, KnowledgeChunk, PageListing, SelectedPage, TokenUsage};
pub use config::AppConfig;
pub use discover::{SiteDiscoverer, WebDiscoverer};
pub use jobs::{
    registry::JobRegistry,
    runner::{JobParams, JobRunner, RunnerConfig},
    CrawlerKind, Job, JobStatus, JobSummary, JobView,
};
pub use server::app::{build_router, AppState};
