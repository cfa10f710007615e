//! Model routing with sequential fallback
//!
//! The router picks a primary provider per request (explicit caller
//! preference, else a complexity heuristic), then walks the remaining
//! providers in a fixed order when attempts fail. Each attempt runs under
//! the uniform provider timeout, and a provider is attempted at most once
//! per request. When every provider fails, the deterministic fallback
//! responder answers - `route` never returns an error.

pub mod fallback;

pub use fallback::FallbackResponder;

use crate::metrics::{Metrics, Outcome};
use crate::providers::{
    Category, GenerationRequest, ModelPreference, Provider, ProviderRegistry, RequestContext,
    saar_system_prompt,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Confidence attached to fallback answers
const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Complexity markers in user prompts (German analytic verbs and nouns)
const COMPLEXITY_KEYWORDS: &[&str] = &[
    "analysiere",
    "erkläre",
    "vergleiche",
    "bewerte",
    "entwickle",
    "strategie",
    "plan",
    "konzept",
    "lösung",
    "problem",
];

/// Prompts shorter than this count as simple (absent other signals)
const SHORT_PROMPT_CHARS: usize = 100;
/// Prompts longer than this count as complex regardless of content
const LONG_PROMPT_CHARS: usize = 300;

/// A routed generation request
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub prompt: String,
    pub context: Option<RequestContext>,
    pub preference: ModelPreference,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Caller identity for usage attribution; never affects routing
    pub user_id: Option<String>,
}

/// A routed answer with provenance
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub content: String,
    pub provider: String,
    pub confidence: f64,
    pub fallback: bool,
    pub timestamp: String,
}

/// Classify a prompt as complex
///
/// Complex means: carries an analytic keyword, asks more than one question,
/// or simply runs long. Used both for primary-provider selection and
/// nowhere else - the fallback chain ignores complexity.
pub fn is_complex_query(prompt: &str) -> bool {
    let normalized = prompt.to_lowercase();
    if COMPLEXITY_KEYWORDS.iter().any(|kw| normalized.contains(kw)) {
        return true;
    }
    if prompt.matches('?').count() > 1 {
        return true;
    }
    prompt.chars().count() > LONG_PROMPT_CHARS
}

/// Routes generation requests across the provider registry
pub struct ModelRouter {
    registry: Arc<ProviderRegistry>,
    responder: FallbackResponder,
    metrics: Metrics,
    timeout: Duration,
}

impl ModelRouter {
    pub fn new(registry: Arc<ProviderRegistry>, metrics: Metrics, timeout: Duration) -> Self {
        Self {
            registry,
            responder: FallbackResponder::new(),
            metrics,
            timeout,
        }
    }

    /// Pick the primary category for a request
    ///
    /// An explicit caller preference wins when that tier's provider is
    /// enabled. Otherwise: short and simple goes to the fast tier, complex
    /// goes to the reasoning tier, everything else to the general tier.
    pub fn primary_category(&self, request: &RouteRequest) -> Category {
        if let Some(category) = request.preference.category() {
            if self.registry.by_category(category).is_some() {
                return category;
            }
        }

        let complex = is_complex_query(&request.prompt);
        if request.prompt.chars().count() < SHORT_PROMPT_CHARS && !complex {
            Category::Fast
        } else if complex {
            Category::Reasoning
        } else {
            Category::General
        }
    }

    /// Ordered distinct providers to attempt for a request
    ///
    /// Primary category first, then the remaining tiers in fixed order
    /// (general, fast, reasoning). Providers missing from the registry are
    /// skipped; the list never contains a provider twice.
    fn attempt_order(&self, request: &RouteRequest) -> Vec<Arc<dyn Provider>> {
        let primary = self.primary_category(request);
        let tiers = [
            primary,
            Category::General,
            Category::Fast,
            Category::Reasoning,
        ];

        let mut order: Vec<Arc<dyn Provider>> = Vec::new();
        for tier in tiers {
            if let Some(provider) = self.registry.by_category(tier) {
                if !order.iter().any(|p| p.name() == provider.name()) {
                    order.push(provider);
                }
            }
        }
        order
    }

    /// Route a request to a provider, falling back through the chain
    ///
    /// Infallible: when every attempt fails, the fallback responder answers.
    pub async fn route(&self, request: &RouteRequest) -> GenerationResult {
        let generation = GenerationRequest {
            prompt: request.prompt.clone(),
            system_prompt: saar_system_prompt(request.context.as_ref()),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let order = self.attempt_order(request);
        let mut attempted: Vec<&'static str> = Vec::new();

        for provider in order {
            let name = provider.name();
            attempted.push(name);
            let started = Instant::now();

            match tokio::time::timeout(self.timeout, provider.generate(&generation)).await {
                Ok(Ok(content)) => {
                    let elapsed_ms = started.elapsed().as_millis() as f64;
                    self.metrics.record_generation(name, Outcome::Success);
                    self.metrics.record_generation_duration(name, elapsed_ms);

                    let chars = request.prompt.chars().count() + content.chars().count();
                    let cost_usd = (chars as f64 / 1000.0) * provider.cost_per_1k_chars();
                    self.metrics.record_estimated_cost(name, cost_usd);

                    tracing::info!(
                        provider = name,
                        elapsed_ms,
                        cost_usd,
                        attempts = attempted.len(),
                        user_id = request.user_id.as_deref().unwrap_or("anonymous"),
                        "Generation served"
                    );

                    return GenerationResult {
                        content,
                        provider: name.to_string(),
                        confidence: provider.confidence(),
                        fallback: false,
                        timestamp: chrono::Utc::now().to_rfc3339(),
                    };
                }
                Ok(Err(e)) => {
                    self.metrics.record_generation(name, Outcome::Failure);
                    tracing::warn!(
                        provider = name,
                        error = %e,
                        "Provider failed, trying next in chain"
                    );
                }
                Err(_) => {
                    self.metrics.record_generation(name, Outcome::Failure);
                    let error = crate::error::AppError::ProviderTimeout {
                        provider: name.to_string(),
                        timeout_seconds: self.timeout.as_secs(),
                    };
                    tracing::warn!(
                        provider = name,
                        error = %error,
                        "Provider timed out, trying next in chain"
                    );
                }
            }
        }

        self.metrics.record_fallback();
        tracing::warn!(
            attempted = ?attempted,
            "All providers exhausted, serving deterministic fallback"
        );

        GenerationResult {
            content: self.responder.respond(&request.prompt),
            provider: "fallback".to_string(),
            confidence: FALLBACK_CONFIDENCE,
            fallback: true,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
