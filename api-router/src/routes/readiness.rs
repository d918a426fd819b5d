use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use common::storage::store::VIDEO_PREFIX;
use serde_json::json;

use crate::api_state::ApiState;

/// Readiness probe: returns 200 if artifact storage answers, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    match state.pipeline.storage().list(Some(VIDEO_PREFIX)).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": { "storage": "ok" }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "checks": { "storage": "fail" },
                "reason": e.to_string()
            })),
        ),
    }
}
