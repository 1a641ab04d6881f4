use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use normbot_core::config::LlmConfig;
use normbot_core::errors::ApplicationError;

use crate::prompt::ChatMessage;

/// Returned in place of an answer when the provider sends no completion text.
pub const EMPTY_COMPLETION_PLACEHOLDER: &str = "Ошибка: пустой ответ от модели";

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { model: "gpt-4o-mini".to_string(), max_tokens: 950, temperature: 0.25 }
    }
}

impl From<&LlmConfig> for GenerationParams {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            model: llm.model.clone(),
            max_tokens: llm.max_output_tokens,
            temperature: llm.temperature,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider returned status {status}")]
    Status { status: u16, detail: Option<String> },
    #[error("provider transport failure: {0}")]
    Transport(String),
    #[error("provider response could not be decoded: {0}")]
    Decode(String),
}

impl From<ProviderError> for ApplicationError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Status { status, detail } => Self::Provider { status: Some(status), detail },
            ProviderError::Transport(detail) | ProviderError::Decode(detail) => {
                Self::Provider { status: None, detail: Some(detail) }
            }
        }
    }
}

/// A single non-streaming chat completion call. No retries.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;

    fn name(&self) -> &'static str;

    /// False when the provider lacks a credential and every call would fail.
    fn is_configured(&self) -> bool {
        true
    }
}

pub struct OpenAiCompletionProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompletionProvider {
    pub fn from_config(llm: &LlmConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            api_key: llm.credential().cloned(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| ProviderError::Status {
            status: 401,
            detail: Some("missing provider credential".to_string()),
        })?;

        let body = ChatCompletionBody {
            model: &request.params.model,
            messages: &request.messages,
            max_tokens: request.params.max_tokens,
            temperature: request.params.temperature,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| ProviderError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.ok().filter(|text| !text.is_empty());
            return Err(ProviderError::Status { status: status.as_u16(), detail });
        }

        let payload: Value =
            response.json().await.map_err(|error| ProviderError::Decode(error.to_string()))?;
        Ok(extract_completion(&payload))
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// First choice's message content, or the placeholder when it is absent or empty.
pub fn extract_completion(payload: &Value) -> String {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.is_empty())
        .unwrap_or(EMPTY_COMPLETION_PLACEHOLDER)
        .to_string()
}
