//! Application state and router assembly.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::jobs::registry::JobRegistry;
use crate::jobs::runner::JobRunner;
use crate::server::middleware::require_api_key;
use crate::server::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub runner: Arc<JobRunner>,
    pub config: Arc<AppConfig>,
}

/// Build the full router: authenticated job routes plus the open health
/// endpoint.
pub fn build_router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/api/knowledge-bases", post(routes::jobs::create_job))
        .route("/api/knowledge-base-jobs", get(routes::jobs::list_jobs))
        .route("/api/knowledge-base-jobs/:id", get(routes::jobs::job_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(authed)
        .route("/api/health", get(routes::health::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
