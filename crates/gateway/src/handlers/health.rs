//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ragline_common::VectorStore;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub index: IndexCheck,
}

#[derive(Serialize)]
pub struct IndexCheck {
    pub documents: usize,
    pub dimension: usize,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - an empty index still serves, but is reported
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let index = state.pipeline.index();
    let status = if index.is_empty() { "ready_empty_index" } else { "ready" };

    Json(ReadyResponse {
        status: status.to_string(),
        checks: HealthChecks {
            index: IndexCheck {
                documents: index.len(),
                dimension: index.dimension(),
            },
        },
    })
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
