//! Mock backend for testing
//!
//! Answers from a per-model script and records every call. Models without a
//! script get the default reply, which is a generic, guard-safe coaching
//! line unless overridden. Useful for unit tests and for running the CLI
//! without a provider (`AI_BACKEND=mock`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::types::{CompletionRequest, ProviderError};
use super::AIBackend;

const DEFAULT_REPLY: &str =
    "You followed through on most of what you planned. What helped the most today?";

/// Scripted answer for one model
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Text(String),
    /// Provider error with this status and message
    Error(u16, String),
    /// Region-block envelope (403, "not available in your region")
    RegionBlocked,
    /// Transport-level failure with no status, like a timeout
    Timeout,
    /// Never answers, like a provider that accepts the request and hangs
    Stall,
}

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub model: String,
    pub request: CompletionRequest,
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    replies: Arc<HashMap<String, MockReply>>,
    default_reply: MockReply,
    calls: Arc<Mutex<Vec<MockCall>>>,
    /// Whether health_check should return true
    pub healthy: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, default reply for every model)
    pub fn new() -> Self {
        Self {
            replies: Arc::new(HashMap::new()),
            default_reply: MockReply::Text(DEFAULT_REPLY.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
            healthy: true,
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Script the answer for one model
    pub fn with_reply(mut self, model: &str, reply: MockReply) -> Self {
        Arc::make_mut(&mut self.replies).insert(model.to_string(), reply);
        self
    }

    /// Answer for models without a script
    pub fn with_default_reply(mut self, reply: MockReply) -> Self {
        self.default_reply = reply;
        self
    }

    /// Every model is region-blocked
    pub fn all_region_blocked() -> Self {
        Self::new().with_default_reply(MockReply::RegionBlocked)
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Models called so far, in order
    pub fn called_models(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockCall {
                model: model.to_string(),
                request: request.clone(),
            });

        match self.replies.get(model).unwrap_or(&self.default_reply) {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Error(status, message) => Err(Error::Provider(ProviderError::new(
                Some(*status),
                message.clone(),
            ))),
            MockReply::RegionBlocked => Err(Error::Provider(ProviderError::new(
                Some(403),
                "This model is not available in your region",
            ))),
            MockReply::Timeout => Err(Error::Provider(ProviderError::new(
                None,
                "operation timed out",
            ))),
            MockReply::Stall => std::future::pending().await,
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
