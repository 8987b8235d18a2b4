//! End-to-end pipeline tests over the mock analyst and discoverer.

use std::sync::Arc;
use std::time::Duration;

use discovery::{DiscoveredPage, PageOrigin};
use server_core::ai::SelectedPage;
use server_core::jobs::registry::JobRegistry;
use server_core::jobs::runner::{JobParams, JobRunner, RunnerConfig};
use server_core::jobs::{CrawlerKind, ExtractionStatus, Job, JobStatus};
use server_core::testing::{CompileBehavior, MockAnalyst, MockDiscoverer};

fn page(url: &str, title: &str) -> DiscoveredPage {
    DiscoveredPage::new(url, PageOrigin::Sitemap)
        .with_title(title)
        .with_html(format!("<html><title>{title}</title><body>content</body></html>"))
}

fn five_page_site() -> MockDiscoverer {
    MockDiscoverer::new()
        .with_page(
            DiscoveredPage::new("https://site.test/", PageOrigin::Seed)
                .with_title("Home")
                .with_html("<html><title>Home</title></html>"),
        )
        .with_page(page("https://site.test/about", "About"))
        .with_page(page("https://site.test/contact", "Contact"))
        .with_page(page("https://site.test/terms", "Terms"))
        .with_page(page("https://site.test/faq", "FAQ"))
}

fn selection_of(urls: &[&str]) -> Vec<SelectedPage> {
    urls.iter()
        .map(|url| SelectedPage {
            url: url.to_string(),
            title: None,
            reason: None,
        })
        .collect()
}

struct Harness {
    registry: Arc<JobRegistry>,
    runner: Arc<JobRunner>,
}

impl Harness {
    fn new(analyst: MockAnalyst, discoverer: MockDiscoverer) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let runner = Arc::new(JobRunner::new(
            registry.clone(),
            Arc::new(analyst),
            Arc::new(discoverer),
            RunnerConfig::default(),
        ));
        Self { registry, runner }
    }

    async fn run_job(&self, url: &str, max_pages: usize) -> Job {
        let job = Job::new(url, max_pages, CrawlerKind::Http);
        let id = job.id;
        self.registry.insert(job);
        self.runner
            .execute(
                id,
                JobParams {
                    url: url.to_string(),
                    max_pages,
                    use_browser: false,
                },
            )
            .await;
        self.registry.snapshot(id).unwrap()
    }
}

#[tokio::test]
async fn successful_job_completes_with_result() {
    let harness = Harness::new(MockAnalyst::new(), five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    let document = job.final_knowledge_base.unwrap();
    assert!(document.contains("Knowledge base for https://site.test/"));
    assert_eq!(job.language.as_deref(), Some("English"));
    assert_eq!(job.discovered_pages.len(), 5);
    assert!(job.usage.prompt_tokens > 0);
    assert!(job.estimated_cost_usd > rust_decimal::Decimal::ZERO);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());
}

#[tokio::test]
async fn partial_extraction_failures_do_not_fail_the_job() {
    // 5 selected pages, 2 raise extraction errors: the job completes with
    // the 3 successful chunks.
    let analyst = MockAnalyst::new()
        .with_selection(selection_of(&[
            "https://site.test/",
            "https://site.test/about",
            "https://site.test/contact",
            "https://site.test/terms",
            "https://site.test/faq",
        ]))
        .failing_extraction("https://site.test/about")
        .failing_extraction("https://site.test/terms");

    let harness = Harness::new(analyst, five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.chunk_count, 3);

    let failed: Vec<_> = job
        .extractions
        .iter()
        .filter(|record| record.status == ExtractionStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|record| record.error.is_some()));

    let extracted = job
        .extractions
        .iter()
        .filter(|record| record.status == ExtractionStatus::Extracted)
        .count();
    assert_eq!(extracted, 3);
}

#[tokio::test]
async fn empty_discovery_fails_with_message() {
    let harness = Harness::new(MockAnalyst::new(), MockDiscoverer::new());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("no pages discovered."));
    assert!(job.final_knowledge_base.is_none());
}

#[tokio::test]
async fn empty_selection_fails_the_job() {
    let harness = Harness::new(MockAnalyst::new().selecting_none(), five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("AI selected no relevant pages."));
}

#[tokio::test]
async fn total_extraction_failure_fails_the_job() {
    let analyst = MockAnalyst::new()
        .with_selection(selection_of(&["https://site.test/about"]))
        .failing_extraction("https://site.test/about");

    let harness = Harness::new(analyst, five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("failed to extract content from any selected page.")
    );
}

#[tokio::test]
async fn oversized_compilation_degrades_but_completes() {
    let analyst = MockAnalyst::new().with_compile_behavior(CompileBehavior::ContextLength);
    let harness = Harness::new(analyst, five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    // Compilation overflow is reported as content, not as job failure.
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.error.is_none());
    assert!(job
        .final_knowledge_base
        .unwrap()
        .contains("too large for the model"));
}

#[tokio::test]
async fn unrecoverable_compilation_error_fails_the_job() {
    let analyst = MockAnalyst::new().with_compile_behavior(CompileBehavior::Error);
    let harness = Harness::new(analyst, five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("compilation failed"));
}

#[tokio::test]
async fn discovery_resource_errors_fail_the_job() {
    let harness = Harness::new(MockAnalyst::new(), MockDiscoverer::new().failing());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("Discovery failed"));
}

#[tokio::test]
async fn sampled_status_never_goes_backwards() {
    let discoverer = five_page_site().with_stage_delay(Duration::from_millis(50));
    let harness = Harness::new(MockAnalyst::new(), discoverer);

    let job = Job::new("https://site.test/", 15, CrawlerKind::Http);
    let id = job.id;
    harness.registry.insert(job);

    let handle = harness.runner.spawn(
        id,
        JobParams {
            url: "https://site.test/".to_string(),
            max_pages: 15,
            use_browser: false,
        },
    );

    let mut last_rank = 0;
    while !harness.registry.snapshot(id).unwrap().status.is_terminal() {
        let rank = harness.registry.snapshot(id).unwrap().status.rank();
        assert!(rank >= last_rank, "status regressed");
        last_rank = rank;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    handle.await.unwrap();
    assert_eq!(
        harness.registry.snapshot(id).unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn token_usage_and_cost_accumulate_across_stages() {
    // language detect (20/2) + selection (50/15) + 5 extractions (200/80
    // each) + compile (300/150)
    let harness = Harness::new(MockAnalyst::new(), five_page_site());
    let job = harness.run_job("https://site.test/", 15).await;

    assert_eq!(job.usage.prompt_tokens, 20 + 50 + 5 * 200 + 300);
    assert_eq!(job.usage.completion_tokens, 2 + 15 + 5 * 80 + 150);
}
