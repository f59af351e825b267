//! API route handlers
//!
//! - `health`: liveness, readiness and Prometheus metrics
//! - `events`: batch event ingestion
//! - `queries`: JSON AST analytical queries
//! - `organizations`: users, organizations and memberships

pub mod events;
pub mod health;
pub mod organizations;
pub mod queries;

use crate::error::ServerError;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info (GET /, no authentication).
pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "Streamly Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": [
            "/v1/events/ingest",
            "/v1/queries",
            "/v1/users",
            "/v1/organizations",
            "/health",
            "/ready",
            "/metrics"
        ]
    }))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
