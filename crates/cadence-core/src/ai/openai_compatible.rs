//! OpenAI-compatible backend implementation
//!
//! Works with any server or gateway that implements the OpenAI chat
//! completions API (`POST {host}/v1/chat/completions`), including hosted
//! routers that front several providers and local servers such as vLLM or
//! llama-server.
//!
//! # Configuration
//!
//! Environment variables:
//! - `CADENCE_AI_HOST`: Server URL (required)
//! - `CADENCE_AI_API_KEY`: Bearer token if required (optional)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::types::{CompletionRequest, ProviderError};
use super::AIBackend;

pub const HOST_ENV: &str = "CADENCE_AI_HOST";
pub const API_KEY_ENV: &str = "CADENCE_AI_API_KEY";

/// Sent as `X-Title` so gateways can attribute traffic
const APP_TITLE: &str = "Cadence";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn user_agent() -> String {
    format!("cadence/{}", env!("CARGO_PKG_VERSION"))
}

/// OpenAI-compatible backend
///
/// # Example
///
/// ```rust,ignore
/// export CADENCE_AI_HOST="https://openrouter.ai/api"
/// export CADENCE_AI_API_KEY="sk-..."
///
/// // Local vLLM
/// export CADENCE_AI_HOST="http://192.168.1.100:8000"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Per-request timeout; an expired request is a hard failure
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create from environment variables
    ///
    /// Required: `CADENCE_AI_HOST`
    /// Optional: `CADENCE_AI_API_KEY`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var(HOST_ENV).ok()?;
        let mut backend = Self::new(&host);
        backend.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        Some(backend)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI chat completion response
///
/// Some gateways answer 200 with an error envelope instead of choices.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `{"error": {"message": ...}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Pull the provider message out of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model,
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
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.timeout)
            .header("User-Agent", user_agent())
            .header("X-Title", APP_TITLE)
            .json(&body);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(ProviderError::new(
                Some(status),
                error_message(&body),
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;
        if let Some(error) = chat_response.error {
            return Err(Error::Provider(ProviderError::new(None, error.message)));
        }

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::InvalidData("No choices in completion response".into()))?;

        debug!(model, chars = content.len(), "Completion received");
        Ok(content)
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .header("User-Agent", user_agent())
            .timeout(self.timeout)
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (common for local servers)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
