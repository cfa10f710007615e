//! Prometheus metrics exposition endpoint

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use axum::{extract::State, http::header, response::IntoResponse};

/// Handle GET /metrics
pub async fn metrics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let body = state
        .metrics()
        .render()
        .map_err(|e| AppError::Internal(format!("metrics encoding: {}", e)))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
