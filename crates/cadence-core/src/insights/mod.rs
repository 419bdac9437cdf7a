//! Coaching insights
//!
//! Turns analysis results into short, user-facing coaching text.
//!
//! ## Pieces
//!
//! - **Types** - insight kinds, stored records, generation context
//! - **Generator** - prompt rendering, model fallback, output guard, template fallback
//! - **Templates** - deterministic text used whenever AI output is unavailable
//! - **Guard** - banned-vocabulary check and word ceiling for AI output
//! - **Service** - per-user and population entry points, including the store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cadence_core::insights::{InsightGenerator, InsightKind, InsightService};
//!
//! let generator = InsightGenerator::new(AIOrchestrator::from_env()?, PromptLibrary::new())?;
//! let service = InsightService::new(db, generator);
//! let insight = service.insight_for("u1", InsightKind::Morning, today, Utc::now()).await?;
//! ```

pub mod generator;
pub mod guard;
pub mod service;
pub mod templates;
pub mod types;

pub use generator::{style_rules, InsightGenerator, PreparedPrompt};
pub use guard::{GuardVerdict, OutputGuard, BANNED_TERMS};
pub use service::{BatchReport, DeliveredInsight, Delivery, InsightService};
pub use types::{
    DayActivity, GeneratedInsight, GenerationSource, GroupPattern, InsightContext, InsightKind,
    InsightRecord,
};
