//! Health and metrics endpoints.
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint (liveness). Reports the headline pipeline counters
/// alongside the status.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.pipeline.stats();
    Json(json!({
        "status": "healthy",
        "queue_size": stats.queue_size,
        "processed_total": stats.processed_total,
        "errors_total": stats.errors_total,
    }))
}

/// Full counter snapshot.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.pipeline.stats())
}
