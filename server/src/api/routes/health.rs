//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::domain::pipeline::PipelineStats;

#[derive(Clone)]
pub struct HealthState {
    pub stats: Arc<PipelineStats>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub requests_processed: u64,
}

pub fn routes(stats: Arc<PipelineStats>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { stats })
}

/// Health check endpoint
async fn health(State(state): State<HealthState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            requests_processed: state.stats.snapshot().requests_total,
        }),
    )
}
