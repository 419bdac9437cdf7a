//! AI backend request and failure types
//!
//! These types are backend-agnostic and used across all AI implementations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One chat completion request, minus the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A non-success answer from the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// HTTP status, when the failure came with one
    pub status: Option<u16>,
    /// Provider message (from the error envelope, or the raw body)
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// How a failed attempt should be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Model unknown or not offered to this caller (bad id, region block)
    Unavailable,
    /// Anything else, including timeouts and transport errors
    Failed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unavailable => "unavailable",
            FailureKind::Failed => "failed",
        }
    }
}

/// Phrases in a provider message that mark the model as unavailable
const UNAVAILABLE_PHRASES: &[&str] = &["not available", "region", "blocked"];

/// Classify an error returned by a backend
pub fn classify_failure(error: &Error) -> FailureKind {
    match error {
        Error::Provider(e) => classify_status(e.status, &e.message),
        Error::Http(e) => classify_status(e.status().map(|s| s.as_u16()), &e.to_string()),
        _ => FailureKind::Failed,
    }
}

fn classify_status(status: Option<u16>, message: &str) -> FailureKind {
    if matches!(status, Some(400) | Some(404)) {
        return FailureKind::Unavailable;
    }
    let message = message.to_lowercase();
    if UNAVAILABLE_PHRASES.iter().any(|p| message.contains(p)) {
        FailureKind::Unavailable
    } else {
        FailureKind::Failed
    }
}

/// What happened when a single model was tried
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AttemptOutcome {
    Success,
    /// Model answered with nothing usable
    Empty,
    Unavailable { detail: String },
    Failed { detail: String },
}

/// Record of one model attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub model: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}
