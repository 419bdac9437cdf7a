//! Pluggable text-generation backend abstraction
//!
//! # Architecture
//!
//! - `AIBackend` trait: one chat completion against a named model
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `MockBackend`
//! - `AIOrchestrator`: walks the model fallback chain, one request per model
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai_compatible, mock). Default: openai_compatible
//! - `CADENCE_AI_HOST`: Server URL (required for openai_compatible)
//! - `CADENCE_AI_API_KEY`: Bearer token if required (optional)
//! - `CADENCE_AI_MODEL`: Preferred model, ahead of the configured chain

mod mock;
mod openai_compatible;
pub mod orchestrator;
pub mod types;

pub use mock::{MockBackend, MockCall, MockReply};
pub use openai_compatible::OpenAICompatibleBackend;
pub use orchestrator::{AIOrchestrator, OrchestratorResult, TextRequest};
pub use types::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all text-generation backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run one chat completion against `model`
    ///
    /// Returns the raw content; callers trim and validate it.
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible chat completions endpoint
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai_compatible` (default): Uses CADENCE_AI_HOST and CADENCE_AI_API_KEY
    /// - `mock`: Creates a mock backend
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend =
            std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai_compatible".to_string());

        match backend.to_lowercase().as_str() {
            "openai_compatible" | "openai" | "openrouter" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai_compatible");
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Apply a per-request timeout (no-op for mock)
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_timeout(timeout)),
            AIClient::Mock(b) => AIClient::Mock(b),
        }
    }

    /// Backend name for display
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Mock(_) => "mock",
        }
    }
}

impl From<MockBackend> for AIClient {
    fn from(backend: MockBackend) -> Self {
        AIClient::Mock(backend)
    }
}

impl From<OpenAICompatibleBackend> for AIClient {
    fn from(backend: OpenAICompatibleBackend) -> Self {
        AIClient::OpenAICompatible(backend)
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.complete(model, request).await,
            AIClient::Mock(b) => b.complete(model, request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_kind() {
        assert_eq!(AIClient::mock().kind(), "mock");
        let client: AIClient = OpenAICompatibleBackend::new("http://localhost:1").into();
        assert_eq!(client.kind(), "openai_compatible");
        assert_eq!(client.host(), "http://localhost:1");
    }

    #[tokio::test]
    async fn test_client_delegates_to_mock() {
        let mock = MockBackend::new().with_reply("m", MockReply::Text("hi".into()));
        let client = AIClient::from(mock.clone());
        let request = CompletionRequest {
            system: String::new(),
            user: String::new(),
            max_tokens: 5,
            temperature: 0.7,
        };
        assert_eq!(client.complete("m", &request).await.unwrap(), "hi");
        assert_eq!(mock.called_models(), vec!["m"]);
        assert!(client.health_check().await);
    }
}
