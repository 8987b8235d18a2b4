//! Job creation, status polling, and listing.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::jobs::runner::JobParams;
use crate::jobs::{CrawlerKind, Job, JobView};
use crate::server::app::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub url: String,
    pub max_pages: Option<usize>,
    #[serde(default)]
    pub use_browser: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub message: String,
    pub job_id: Uuid,
    pub status_url: String,
}

/// `POST /api/knowledge-bases` - accept a job and start it in the
/// background. Replies 202 immediately; poll the status URL for progress.
pub async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> Response {
    let is_http = body.url.starts_with("http://") || body.url.starts_with("https://");
    if !is_http || Url::parse(&body.url).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Bad Request",
                "message": "A valid http(s) 'url' is required."
            })),
        )
            .into_response();
    }

    let ceiling = state.config.max_pages_per_job;
    let max_pages = body.max_pages.unwrap_or(ceiling).min(ceiling).max(1);
    let crawler = if body.use_browser {
        CrawlerKind::Browser
    } else {
        CrawlerKind::Http
    };

    let job = Job::new(body.url.clone(), max_pages, crawler);
    let job_id = job.id;
    state.registry.insert(job);

    state.runner.spawn(
        job_id,
        JobParams {
            url: body.url.clone(),
            max_pages,
            use_browser: body.use_browser,
        },
    );

    info!(job_id = %job_id, url = %body.url, max_pages, "Accepted knowledge base job");

    (
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            message: "Knowledge base job started; the site language is auto-detected.".to_string(),
            job_id,
            status_url: format!("/api/knowledge-base-jobs/{job_id}"),
        }),
    )
        .into_response()
}

/// `GET /api/knowledge-base-jobs/:id` - current status snapshot.
pub async fn job_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.registry.snapshot(id) {
        Some(job) => (StatusCode::OK, Json(JobView::from(job))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Not Found", "message": "Job ID not found." })),
        )
            .into_response(),
    }
}

/// `GET /api/knowledge-base-jobs` - every job, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> Response {
    let mut jobs = state.registry.summaries();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    (
        StatusCode::OK,
        Json(json!({
            "total_jobs": jobs.len(),
            "queue_depth": state.runner.queue_depth(),
            "jobs": jobs,
        })),
    )
        .into_response()
}
