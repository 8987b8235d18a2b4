//! `api-key` header authentication.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::server::app::AppState;

/// Require an exact match on the `api-key` header for every request.
///
/// Missing or wrong keys get a 401; a misconfigured (empty) service key is
/// a 500, since that is an operator error, not a caller error.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.service_api_key.is_empty() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Internal Server Error",
                "message": "Service API key is not configured."
            })),
        )
            .into_response();
    }

    let provided = request
        .headers()
        .get("api-key")
        .and_then(|value| value.to_str().ok());

    match provided {
        None => {
            warn!("Unauthorized request: missing api-key header");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized: missing 'api-key' header" })),
            )
                .into_response()
        }
        Some(key) if key != state.config.service_api_key => {
            let prefix: String = key.chars().take(4).collect();
            warn!(key_prefix = %prefix, "Unauthorized request: invalid api-key");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized: invalid API key" })),
            )
                .into_response()
        }
        Some(_) => next.run(request).await,
    }
}
