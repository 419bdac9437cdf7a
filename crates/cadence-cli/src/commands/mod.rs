//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analysis` - Feature vectors and stage evaluation for one user
//! - `core` - Init and shared utilities (open_db, build_service, argument parsing)
//! - `import` - JSON activity import
//! - `insights` - Insight generation, history and population batch
//! - `models` - Model fallback chain
//! - `prompts` - Prompt library management commands
//! - `status` - Database status

pub mod analysis;
pub mod core;
pub mod import;
pub mod insights;
pub mod models;
pub mod prompts;
pub mod status;

// Re-export command functions for main.rs
pub use analysis::*;
pub use core::*;
pub use import::*;
pub use insights::*;
pub use models::*;
pub use prompts::*;
pub use status::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
