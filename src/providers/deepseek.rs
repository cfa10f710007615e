//! DeepSeek adapter: the reasoning tier
//!
//! Speaks the OpenAI-compatible chat completions dialect against the
//! DeepSeek endpoint. Cheapest of the heavyweight models, preferred for
//! complex analytical queries.

use crate::config::ProviderEndpoint;
use crate::error::{AppError, AppResult};
use crate::providers::{Category, GenerationRequest, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub struct DeepSeekProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl DeepSeekProvider {
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
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl Provider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn category(&self) -> Category {
        Category::Reasoning
    }

    fn confidence(&self) -> f64 {
        0.95
    }

    fn cost_per_1k_chars(&self) -> f64 {
        0.0014
    }

    async fn generate(&self, request: &GenerationRequest) -> AppResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderRequestFailed {
                provider: "deepseek".to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ProviderRequestFailed {
                provider: "deepseek".to_string(),
                reason: format!("status {}", status),
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::ProviderRequestFailed {
                    provider: "deepseek".to_string(),
                    reason: format!("malformed response: {}", e),
                })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::ProviderRequestFailed {
                provider: "deepseek".to_string(),
                reason: "empty completion".to_string(),
            })
    }
}
