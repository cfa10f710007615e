//! Saargate - Regional AI assistant gateway for the Saarland
//!
//! Fronts multiple AI providers (Gemini, DeepSeek, OpenAI) behind a single
//! chat API with heuristic routing, sequential fallback, per-client rate
//! limiting, and a security gate. The gateway always answers: when every
//! provider fails, a deterministic responder serves canned regional content.

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod providers;
pub mod router;
pub mod telemetry;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::AppState;

/// Build the full application router with all middleware layers
///
/// Layer order (outermost first): request tracing, request-id assignment,
/// then the security gate. Shared between the binary and integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/chat/quick", get(handlers::chat::quick_chat))
        .route("/api/embeddings", post(handlers::embeddings::embeddings))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::security_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
