//! Cadence Core Library
//!
//! Shared functionality for the Cadence coaching pipeline:
//! - Database access and migrations (users, activity, stages, insights)
//! - Activity windows and feature extraction
//! - Stage classification, similarity clustering and anonymized aggregates
//! - Pluggable text-generation backends with model fallback
//! - Prompt library for customizable insight prompts
//! - Insight generation with output guard and template fallback
//! - JSON activity import

pub mod ai;
pub mod analysis;
pub mod db;
pub mod error;
pub mod import;
pub mod insights;
pub mod model_chain;
pub mod models;
pub mod prompts;

/// Test utilities including a mock chat completions server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, AIOrchestrator, MockBackend, OpenAICompatibleBackend};
pub use analysis::{FeatureVector, PopulationSnapshot, PopulationWindows};
pub use db::{Database, DatabaseStats};
pub use error::{Error, Result};
pub use import::{import_file, ImportStats};
pub use insights::{
    DeliveredInsight, InsightGenerator, InsightKind, InsightRecord, InsightService,
};
pub use model_chain::ModelChainConfig;
pub use models::{Stage, User, UserProfile, UserStageRecord};
pub use prompts::{Prompt, PromptInfo, PromptLibrary};
