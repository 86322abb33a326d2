use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::application::ports::{Completion, CompletionRequest, LlmClient, LlmClientError};
use crate::presentation::config::Settings;

/// Chat-completions client for OpenAI and API-compatible endpoints.
pub struct OpenAiChatClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: &str,
        max_tokens: usize,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, LlmClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmClientError::ApiRequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens,
            temperature,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, LlmClientError> {
        Self::new(
            settings.openai_api_key.clone().unwrap_or_default(),
            settings.llm_model.clone(),
            &settings.openai_base_url,
            settings.llm_max_tokens,
            settings.llm_temperature,
            settings.request_timeout(),
        )
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: request.temperature.unwrap_or(self.temperature),
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    #[tracing::instrument(skip(self, request), fields(model = %self.model, json_mode = request.json_mode))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmClientError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| LlmClientError::ApiRequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmClientError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(LlmClientError::Unauthorized),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmClientError::ApiRequestFailed(format!(
                    "HTTP {}: {}",
                    status, body
                )));
            }
            _ => {}
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::InvalidResponse(e.to_string()))?;

        let tokens_used = parsed.usage.map(|u| u.total_tokens);
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmClientError::InvalidResponse("empty choices".to_string()))?;

        tracing::debug!(tokens_used = ?tokens_used, "Completion received");

        Ok(Completion { text, tokens_used })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
