//! Health check endpoint
//!
//! The plain check reports which providers are configured without any
//! network traffic. `?probe=true` additionally fires a tiny generation at
//! each provider under a short timeout - advisory only, the endpoint stays
//! 200 OK regardless of probe results.

use crate::handlers::AppState;
use crate::providers::GenerationRequest;
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-provider probe budget; kept well under the generation timeout
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    #[serde(default)]
    probe: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    /// Configured providers; value is configured-ness, or reachability when probed
    providers: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probed: Option<bool>,
}

/// Handle GET /health
pub async fn health(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> impl IntoResponse {
    let providers = if query.probe {
        probe_providers(&state).await
    } else {
        state
            .registry()
            .names()
            .into_iter()
            .map(|name| (name.to_string(), true))
            .collect()
    };

    Json(HealthResponse {
        status: "OK",
        service: "saargate",
        version: env!("CARGO_PKG_VERSION"),
        providers,
        probed: query.probe.then_some(true),
    })
}

/// Fire a minimal generation at every provider concurrently
async fn probe_providers(state: &AppState) -> BTreeMap<String, bool> {
    let probes = state.registry().all().iter().map(|provider| {
        let provider = provider.clone();
        async move {
            let request = GenerationRequest {
                prompt: "ping".to_string(),
                system_prompt: "Antworte mit einem Wort.".to_string(),
                max_tokens: 5,
                temperature: 0.0,
            };
            let reachable =
                matches!(
                    tokio::time::timeout(PROBE_TIMEOUT, provider.generate(&request)).await,
                    Ok(Ok(_))
                );
            (provider.name().to_string(), reachable)
        }
    });

    futures::future::join_all(probes).await.into_iter().collect()
}
