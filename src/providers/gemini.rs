//! Google Gemini adapter: the fast tier
//!
//! First choice for short, simple queries. The Gemini API authenticates via
//! a query-string key and uses its own request shape rather than the
//! OpenAI-compatible dialect.

use crate::config::ProviderEndpoint;
use crate::error::{AppError, AppResult};
use crate::providers::{Category, GenerationRequest, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(endpoint: &ProviderEndpoint, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            model: endpoint.model.clone(),
            api_key,
        }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn category(&self) -> Category {
        Category::Fast
    }

    fn confidence(&self) -> f64 {
        0.92
    }

    fn cost_per_1k_chars(&self) -> f64 {
        0.00025
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let body = GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: &request.system_prompt,
                }],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed {
                provider: "gemini".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderRequestFailed {
                provider: "gemini".to_string(),
                reason: format!("status {}", status),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::ProviderRequestFailed {
                    provider: "gemini".to_string(),
                    reason: format!("malformed response: {}", e),
                })?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::ProviderRequestFailed {
                provider: "gemini".to_string(),
                reason: "empty candidate".to_string(),
            });
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(
            &ProviderEndpoint {
                base_url: base_url.to_string(),
                model: "gemini-2.0-flash-exp".to_string(),
                api_key_env: "GOOGLE_AI_API_KEY".to_string(),
            },
            "AIzaSyTest0123456789abcdef".to_string(),
        )
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Wie ist das Wetter?".to_string(),
            system_prompt: "Du bist SAAR-GPT.".to_string(),
            max_tokens: 200,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_generate_authenticates_via_query_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1beta/models/gemini-2.0-flash-exp:generateContent",
            ))
            .and(query_param("key", "AIzaSyTest0123456789abcdef"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "Sonnig, "}, {"text": "22 Grad."}]}}]
            })))
            .mount(&server)
            .await;

        let content = provider(&server.uri())
            .generate(&request())
            .await
            .expect("should succeed");
        assert_eq!(content, "Sonnig, 22 Grad.");
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1beta/models/gemini-2.0-flash-exp:generateContent",
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let result = provider(&server.uri()).generate(&request()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_static_descriptor_values() {
        let provider = provider("https://generativelanguage.googleapis.com");
        assert_eq!(provider.name(), "gemini");
        assert_eq!(provider.category(), Category::Fast);
        assert!((provider.confidence() - 0.92).abs() < f64::EPSILON);
        assert!((provider.cost_per_1k_chars() - 0.00025).abs() < f64::EPSILON);
    }
}
