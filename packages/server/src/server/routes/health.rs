//! Health and configuration report.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    message: String,
    model_in_use: String,
    service_api_key_status: String,
    analyst_status: String,
    max_pages_per_job: usize,
    max_concurrent_jobs: usize,
    queue_depth: usize,
    tracked_jobs: usize,
}

/// Health check endpoint (unauthenticated).
///
/// Returns 503 when either required key is missing, since jobs cannot run
/// in that state.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let key_ok = !state.config.service_api_key.is_empty();
    let analyst_ok = !state.config.openai_api_key.is_empty();
    let healthy = key_ok && analyst_ok;

    let response = HealthResponse {
        status: if healthy { "ok" } else { "error" }.to_string(),
        message: "Knowledge base generator API is running.".to_string(),
        model_in_use: state.config.model.clone(),
        service_api_key_status: if key_ok { "configured" } else { "missing" }.to_string(),
        analyst_status: if analyst_ok { "configured" } else { "missing" }.to_string(),
        max_pages_per_job: state.config.max_pages_per_job,
        max_concurrent_jobs: state.config.max_concurrent_jobs,
        queue_depth: state.runner.queue_depth(),
        tracked_jobs: state.registry.len(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}
