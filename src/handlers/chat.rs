//! Chat endpoint handlers
//!
//! `POST /api/chat` routes through the provider chain; `GET /api/chat/quick`
//! answers from a static table without touching any provider.

use crate::handlers::{AppState, ValidatedJson};
use crate::middleware::RequestId;
use crate::providers::{ModelPreference, RequestContext};
use crate::router::{FallbackResponder, RouteRequest};
use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum allowed message length in characters
const MAX_MESSAGE_LENGTH: usize = 10_000;

const DEFAULT_MAX_TOKENS: u32 = 1_000;
const MAX_TOKENS_CEILING: u32 = 4_096;

/// Chat request from client
///
/// Validation is enforced during deserialization - invalid instances cannot
/// exist. Temperature is clamped rather than rejected.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    message: String,
    context: Option<RequestContext>,
    category: ModelPreference,
    max_tokens: u32,
    temperature: f32,
    user_id: Option<String>,
}

impl ChatRequest {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn to_route_request(&self) -> RouteRequest {
        RouteRequest {
            prompt: self.message.clone(),
            context: self.context.clone(),
            preference: self.category,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            user_id: self.user_id.clone(),
        }
    }
}

impl<'de> Deserialize<'de> for ChatRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawChatRequest {
            message: String,
            #[serde(default)]
            context: Option<RequestContext>,
            #[serde(default)]
            category: ModelPreference,
            #[serde(default)]
            max_tokens: Option<u32>,
            #[serde(default)]
            temperature: Option<f32>,
            #[serde(default)]
            user_id: Option<String>,
        }

        let raw = RawChatRequest::deserialize(deserializer)?;

        if raw.message.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "message cannot be empty or contain only whitespace",
            ));
        }

        let char_count = raw.message.chars().count();
        if char_count > MAX_MESSAGE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "message exceeds maximum length of {} characters (got {})",
                MAX_MESSAGE_LENGTH, char_count
            )));
        }

        let max_tokens = raw
            .max_tokens
            .unwrap_or(DEFAULT_MAX_TOKENS)
            .clamp(1, MAX_TOKENS_CEILING);
        let temperature = raw.temperature.unwrap_or(0.7).clamp(0.0, 1.0);

        Ok(ChatRequest {
            message: raw.message,
            context: raw.context,
            category: raw.category,
            max_tokens,
            temperature,
            user_id: raw.user_id,
        })
    }
}

/// Chat response envelope
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    success: bool,
    content: String,
    provider: String,
    confidence: f64,
    fallback: bool,
    timestamp: String,
}

/// Handle POST /api/chat
///
/// Never fails with a provider error: the router absorbs provider failures
/// into the fallback chain and always produces an answer.
pub async fn chat(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> impl IntoResponse {
    tracing::debug!(
        request_id = %request_id,
        message_chars = request.message().chars().count(),
        "Chat request received"
    );

    let result = state.router().route(&request.to_route_request()).await;

    Json(ChatResponse {
        success: true,
        content: result.content,
        provider: result.provider,
        confidence: result.confidence,
        fallback: result.fallback,
        timestamp: result.timestamp,
    })
}

/// Static lookup table for the quick lane; first match wins
const QUICK_ANSWERS: &[(&[&str], &str)] = &[
    (
        &["wetter"],
        "Wetterdaten für das Saarland: dwd.de oder die WarnWetter-App des \
Deutschen Wetterdienstes.",
    ),
    (
        &["verkehr", "stau", "bahn"],
        "Verkehrslage im Saarland: saarVV-Fahrplanauskunft unter saarvv.de, \
Straßenverkehrsmeldungen beim Landesbetrieb für Straßenbau.",
    ),
    (
        &["events", "veranstaltung"],
        "Veranstaltungen im Saarland finden Sie im Kalender auf \
urlaub.saarland und kulturort.saarland.",
    ),
    (
        &["behörden", "amt", "öffnungszeiten"],
        "Behördendienste online: service.saarland.de. Die meisten Bürgerämter \
öffnen Mo-Fr ab 8 Uhr, Termine online buchbar.",
    ),
    (
        &["news", "nachrichten"],
        "Aktuelle Nachrichten aus dem Saarland: sr.de (Saarländischer \
Rundfunk) und saarbruecker-zeitung.de.",
    ),
];

#[derive(Debug, Deserialize)]
pub struct QuickQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
pub struct QuickResponse {
    success: bool,
    response: String,
    mode: &'static str,
    timestamp: String,
}

/// Handle GET /api/chat/quick
///
/// Sub-millisecond lane: a table hit answers in `instant` mode, anything
/// else gets the deterministic fallback answer in `static` mode. No provider
/// is ever called here.
pub async fn quick_chat(Query(query): Query<QuickQuery>) -> impl IntoResponse {
    let normalized = query.q.to_lowercase();

    let hit = QUICK_ANSWERS.iter().find_map(|(keywords, answer)| {
        keywords
            .iter()
            .any(|kw| normalized.contains(kw))
            .then_some(*answer)
    });

    let (response, mode) = match hit {
        Some(answer) => (answer.to_string(), "instant"),
        None => (FallbackResponder::new().respond(&query.q), "static"),
    };

    Json(QuickResponse {
        success: true,
        response,
        mode,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
