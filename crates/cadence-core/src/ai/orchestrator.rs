//! Model fallback orchestration
//!
//! ```text
//! preferred model ─► fallback 1 ─► fallback 2 ─► ... ─► None
//!       │                │              │
//!    success          success        success     (first non-empty text wins)
//! ```
//!
//! Each model in the chain gets exactly one request. Unavailable models
//! (bad id, region block) and hard failures (timeouts, 5xx, malformed
//! responses) both move on to the next model; they are only logged
//! differently. Running out of models yields `None`, never an error.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model_chain::{build_chain, ModelChainConfig};

use super::types::{classify_failure, Attempt, AttemptOutcome, CompletionRequest, FailureKind};
use super::{AIBackend, AIClient};

/// Input to one orchestrated generation
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: String,
    pub user: String,
    /// Tried first; defaults to the configured preferred model
    pub preferred_model: Option<String>,
    pub max_tokens: u32,
    /// Defaults to the configured temperature
    pub temperature: Option<f32>,
}

impl TextRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            preferred_model: None,
            max_tokens,
            temperature: None,
        }
    }
}

/// Result of walking the chain, with every attempt recorded
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResult {
    /// Trimmed, non-empty text from the first model that produced one
    pub text: Option<String>,
    /// Model that produced `text`
    pub model: Option<String>,
    pub attempts: Vec<Attempt>,
}

/// Sequential fallback over the configured model chain
#[derive(Clone)]
pub struct AIOrchestrator {
    client: AIClient,
    config: ModelChainConfig,
}

impl AIOrchestrator {
    /// Create an orchestrator; the config timeout is applied to the client
    pub fn new(client: AIClient, config: ModelChainConfig) -> Self {
        Self {
            client: client.with_timeout(config.timeout),
            config,
        }
    }

    /// Build from `AI_BACKEND`/`CADENCE_AI_*` and the model chain config
    ///
    /// Returns `Ok(None)` when no backend is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let Some(client) = AIClient::from_env() else {
            return Ok(None);
        };
        let config = ModelChainConfig::load()?;
        Ok(Some(Self::new(client, config)))
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    pub fn config(&self) -> &ModelChainConfig {
        &self.config
    }

    /// Models that would be tried for a request, in order, without repeats
    pub fn chain_for(&self, preferred: Option<&str>) -> Vec<String> {
        build_chain(
            preferred.unwrap_or(&self.config.preferred_model),
            self.config.fallbacks.iter().map(|f| f.model.as_str()),
        )
    }

    /// Generate text, or `None` once every model has been tried
    pub async fn generate(&self, request: &TextRequest) -> Option<String> {
        self.generate_traced(request).await.text
    }

    /// Generate text and report what happened with each model
    pub async fn generate_traced(&self, request: &TextRequest) -> OrchestratorResult {
        let chain = self.chain_for(request.preferred_model.as_deref());
        let completion = CompletionRequest {
            system: request.system.clone(),
            user: request.user.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature.unwrap_or(self.config.temperature),
        };

        let mut attempts = Vec::with_capacity(chain.len());

        for model in chain {
            debug!(model = %model, "Requesting completion");

            let outcome = match self.client.complete(&model, &completion).await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        info!(model = %model, attempts = attempts.len() + 1, "Text generated");
                        let text = text.to_string();
                        attempts.push(Attempt {
                            model: model.clone(),
                            outcome: AttemptOutcome::Success,
                        });
                        return OrchestratorResult {
                            text: Some(text),
                            model: Some(model),
                            attempts,
                        };
                    }
                    warn!(model = %model, "Model returned empty text");
                    AttemptOutcome::Empty
                }
                Err(e) => match classify_failure(&e) {
                    FailureKind::Unavailable => {
                        info!(model = %model, error = %e, "Model unavailable, trying next");
                        AttemptOutcome::Unavailable {
                            detail: e.to_string(),
                        }
                    }
                    FailureKind::Failed => {
                        warn!(model = %model, error = %e, "Model request failed, trying next");
                        AttemptOutcome::Failed {
                            detail: e.to_string(),
                        }
                    }
                },
            };

            attempts.push(Attempt { model, outcome });
        }

        warn!(attempts = attempts.len(), "All models exhausted");
        OrchestratorResult {
            text: None,
            model: None,
            attempts,
        }
    }
}
