//! AI provider adapters
//!
//! Each vendor API hides behind the `Provider` trait so the router only sees
//! a uniform generate/embed surface. Providers are constructed once at
//! startup by the `ProviderRegistry`, which reads credentials from the
//! environment and silently skips vendors whose keys are missing or
//! malformed - a gateway with zero providers still serves fallback answers.

pub mod deepseek;
pub mod gemini;
pub mod openai;

pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::ProvidersConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Model capability class a provider is best suited for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Low-latency, short-answer models
    Fast,
    /// Deliberate multi-step reasoning models
    Reasoning,
    /// Balanced general-purpose models
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Reasoning => "reasoning",
            Self::General => "general",
        }
    }
}

/// Caller's model preference; `Auto` defers to the routing heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelPreference {
    #[default]
    Auto,
    Fast,
    Reasoning,
    General,
}

impl ModelPreference {
    /// The explicit category, if the caller named one
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Auto => None,
            Self::Fast => Some(Category::Fast),
            Self::Reasoning => Some(Category::Reasoning),
            Self::General => Some(Category::General),
        }
    }
}

/// Structured context a caller can attach to a request
///
/// Typed instead of a free-form JSON blob so malformed context is rejected
/// at deserialization time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequestContext {
    Location { municipality: String },
    Service { category: String },
    Session { user_id: String },
}

/// A fully-resolved generation request as seen by a provider
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Uniform interface over the vendor APIs
///
/// `generate` returns the raw completion text; the router wraps it with
/// provenance (provider name, confidence, cost). `embed` has a default
/// implementation that refuses, since only some vendors offer embeddings.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> Category;

    /// Static confidence score attached to answers from this provider
    fn confidence(&self) -> f64;

    /// Estimated cost in USD per 1000 characters of combined prompt+answer
    fn cost_per_1k_chars(&self) -> f64;

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String>;

    async fn embed(&self, _input: &str) -> AppResult<Vec<f32>> {
        Err(AppError::ProviderUnavailable {
            provider: self.name().to_string(),
        })
    }
}

/// The set of providers available in this process
///
/// Built once at startup. A provider whose API key is absent or obviously
/// malformed is skipped with a warning rather than failing startup.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Construct from config, reading API keys from the environment
    pub fn from_config(config: &ProvidersConfig) -> Self {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

        match read_api_key(&config.gemini.api_key_env, KeyShape::Opaque) {
            Some(key) => {
                providers.push(Arc::new(GeminiProvider::new(&config.gemini, key)));
            }
            None => tracing::warn!(
                env_var = %config.gemini.api_key_env,
                "Gemini key missing or malformed - provider disabled"
            ),
        }

        match read_api_key(&config.deepseek.api_key_env, KeyShape::SkPrefixed) {
            Some(key) => {
                providers.push(Arc::new(DeepSeekProvider::new(&config.deepseek, key)));
            }
            None => tracing::warn!(
                env_var = %config.deepseek.api_key_env,
                "DeepSeek key missing or malformed - provider disabled"
            ),
        }

        match read_api_key(&config.openai.api_key_env, KeyShape::SkPrefixed) {
            Some(key) => {
                providers.push(Arc::new(OpenAiProvider::new(&config.openai, key)));
            }
            None => tracing::warn!(
                env_var = %config.openai.api_key_env,
                "OpenAI key missing or malformed - provider disabled"
            ),
        }

        tracing::info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "Provider registry initialized"
        );

        Self { providers }
    }

    /// Registry with an explicit provider set (tests)
    pub fn with_providers(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn by_category(&self, category: Category) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|p| p.category() == category)
            .cloned()
    }

    pub fn all(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The provider used for embeddings, when one is available
    pub fn embedder(&self) -> Option<Arc<dyn Provider>> {
        self.get("openai")
    }
}

/// Expected shape of an API key, checked before a provider is enabled
enum KeyShape {
    /// OpenAI-style keys: `sk-` prefix
    SkPrefixed,
    /// No known prefix, length check only
    Opaque,
}

/// Read and sanity-check an API key from the environment
///
/// Placeholder values left over from `.env` templates ("your-key-here") are
/// rejected the same as absent keys.
fn read_api_key(env_var: &str, shape: KeyShape) -> Option<String> {
    let key = std::env::var(env_var).ok()?;
    let key = key.trim();

    if key.len() < 20 || key.contains("your-") || key.contains("placeholder") {
        return None;
    }
    if matches!(shape, KeyShape::SkPrefixed) && !key.starts_with("sk-") {
        return None;
    }

    Some(key.to_string())
}

/// Build the regional assistant system prompt
///
/// German persona grounded in Saarland services; callers may attach a JSON
/// context block (location, service area, session data) that is embedded
/// verbatim for the model.
pub fn saar_system_prompt(context: Option<&RequestContext>) -> String {
    let mut prompt = format!(
        "Du bist SAAR-GPT, der offizielle KI-Assistent für das Saarland \
(agentland.saarland). Aktuelles Datum: {}.\n\n\
Deine Aufgaben:\n\
- Beantworte Fragen zu Behörden, Verwaltung und Bürgerservices im Saarland\n\
- Hilf bei Tourismus, Sehenswürdigkeiten und Veranstaltungen (z.B. Saarschleife, Völklinger Hütte)\n\
- Unterstütze Unternehmen bei Gründung, Förderprogrammen und Wirtschaftskontakten\n\
- Informiere über Bildung, Universität des Saarlandes und Weiterbildung\n\n\
Regeln:\n\
- Antworte in der Sprache der Nutzerfrage (Standard: Deutsch)\n\
- Sei präzise und konkret; nenne Ansprechpartner und Webseiten wenn bekannt\n\
- Erfinde keine Telefonnummern, Adressen oder Öffnungszeiten\n\
- Bei Unsicherheit verweise auf service.saarland.de oder die zuständige Behörde",
        chrono::Utc::now().format("%Y-%m-%d")
    );

    if let Some(context) = context {
        // Serialization of the tagged enum cannot fail
        if let Ok(block) = serde_json::to_string(context) {
            prompt.push_str("\n\nKontext zur Anfrage:\n");
            prompt.push_str(&block);
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_preference_auto_has_no_category() {
        assert_eq!(ModelPreference::Auto.category(), None);
        assert_eq!(ModelPreference::Fast.category(), Some(Category::Fast));
        assert_eq!(
            ModelPreference::Reasoning.category(),
            Some(Category::Reasoning)
        );
        assert_eq!(ModelPreference::General.category(), Some(Category::General));
    }

    #[test]
    fn test_model_preference_deserializes_lowercase() {
        let pref: ModelPreference = serde_json::from_str("\"reasoning\"").expect("should parse");
        assert_eq!(pref, ModelPreference::Reasoning);
        let pref: ModelPreference = serde_json::from_str("\"auto\"").expect("should parse");
        assert_eq!(pref, ModelPreference::Auto);
    }

    #[test]
    fn test_read_api_key_rejects_short_and_placeholder_keys() {
        unsafe {
            std::env::set_var("SAARGATE_TEST_KEY_SHORT", "sk-abc");
            std::env::set_var(
                "SAARGATE_TEST_KEY_PLACEHOLDER",
                "sk-your-key-here-padded-to-length-xxxx",
            );
            std::env::set_var(
                "SAARGATE_TEST_KEY_VALID",
                "sk-0123456789abcdef0123456789abcdef",
            );
        }
        assert!(read_api_key("SAARGATE_TEST_KEY_SHORT", KeyShape::SkPrefixed).is_none());
        assert!(read_api_key("SAARGATE_TEST_KEY_PLACEHOLDER", KeyShape::SkPrefixed).is_none());
        assert!(read_api_key("SAARGATE_TEST_KEY_VALID", KeyShape::SkPrefixed).is_some());
        assert!(read_api_key("SAARGATE_TEST_KEY_ABSENT", KeyShape::Opaque).is_none());
    }

    #[test]
    fn test_read_api_key_enforces_sk_prefix_only_when_asked() {
        unsafe {
            std::env::set_var(
                "SAARGATE_TEST_KEY_OPAQUE",
                "AIzaSy0123456789abcdef0123456789",
            );
        }
        assert!(read_api_key("SAARGATE_TEST_KEY_OPAQUE", KeyShape::Opaque).is_some());
        assert!(read_api_key("SAARGATE_TEST_KEY_OPAQUE", KeyShape::SkPrefixed).is_none());
    }

    #[test]
    fn test_system_prompt_embeds_context_json() {
        let context = RequestContext::Location {
            municipality: "Saarbrücken".to_string(),
        };
        let prompt = saar_system_prompt(Some(&context));
        assert!(prompt.contains("SAAR-GPT"));
        assert!(prompt.contains("Saarbrücken"));
        assert!(prompt.contains("Kontext zur Anfrage"));
    }

    #[test]
    fn test_request_context_deserializes_tagged() {
        let context: RequestContext =
            serde_json::from_str(r#"{"type": "service", "category": "tourism"}"#)
                .expect("should parse");
        assert_eq!(
            context,
            RequestContext::Service {
                category: "tourism".to_string()
            }
        );
        assert!(serde_json::from_str::<RequestContext>(r#"{"type": "bogus"}"#).is_err());
    }

    #[test]
    fn test_system_prompt_without_context_omits_block() {
        let prompt = saar_system_prompt(None);
        assert!(!prompt.contains("Kontext zur Anfrage"));
    }

    #[test]
    fn test_empty_registry_reports_no_providers() {
        let registry = ProviderRegistry::with_providers(Vec::new());
        assert!(registry.is_empty());
        assert!(registry.get("openai").is_none());
        assert!(registry.by_category(Category::Fast).is_none());
        assert!(registry.embedder().is_none());
    }
}
