//! Embeddings endpoint handler
//!
//! Degrades instead of failing: when no embedder is configured or the
//! vendor call fails, the response is still a success envelope with an
//! empty vector. Callers treat an empty embedding as "semantic features
//! unavailable".

use crate::handlers::{AppState, ValidatedJson};
use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Deserializer, Serialize};

/// Embedding request from client
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    text: String,
}

impl EmbeddingRequest {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl<'de> Deserialize<'de> for EmbeddingRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawEmbeddingRequest {
            text: String,
        }

        let raw = RawEmbeddingRequest::deserialize(deserializer)?;
        if raw.text.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "text cannot be empty or contain only whitespace",
            ));
        }
        Ok(EmbeddingRequest { text: raw.text })
    }
}

#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
    success: bool,
    embedding: Vec<f32>,
    dimensions: usize,
}

/// Handle POST /api/embeddings
pub async fn embeddings(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmbeddingRequest>,
) -> impl IntoResponse {
    let embedding = match state.registry().embedder() {
        Some(provider) => match provider.embed(request.text()).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, "Embedding call failed, returning empty vector");
                Vec::new()
            }
        },
        None => {
            tracing::warn!("No embedding provider configured, returning empty vector");
            Vec::new()
        }
    };

    let dimensions = embedding.len();
    Json(EmbeddingResponse {
        success: true,
        embedding,
        dimensions,
    })
}
