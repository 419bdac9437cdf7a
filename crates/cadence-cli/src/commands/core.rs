//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `build_service` - Insight service wired to the configured AI backend
//! - `parse_date_arg` / `parse_kind` - Argument parsing helpers
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use cadence_core::ai::AIOrchestrator;
use cadence_core::insights::{InsightGenerator, InsightKind, InsightService};
use cadence_core::prompts::PromptLibrary;
use cadence_core::Database;
use chrono::{NaiveDate, Utc};
use tracing::debug;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Parse a YYYY-MM-DD argument, defaulting to today (UTC)
pub fn parse_date_arg(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", s)),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn parse_kind(kind: &str) -> Result<InsightKind> {
    kind.parse().map_err(|e: String| {
        let known: Vec<_> = InsightKind::all().iter().map(|k| k.as_str()).collect();
        anyhow!("{} (expected one of: {})", e, known.join(", "))
    })
}

/// Insight service using the AI backend from the environment, if any
pub fn build_service(db: &Database) -> Result<InsightService> {
    let orchestrator =
        AIOrchestrator::from_env().context("Failed to load model chain configuration")?;

    match &orchestrator {
        Some(orch) => debug!(
            backend = orch.client().kind(),
            model = %orch.config().preferred_model,
            "AI backend configured"
        ),
        None => eprintln!("💡 Tip: Set CADENCE_AI_HOST for AI-written insights (using templates)"),
    }

    let generator = InsightGenerator::new(orchestrator, PromptLibrary::new())
        .context("Failed to set up insight generator")?;
    Ok(InsightService::new(db.clone(), generator))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import activity: cadence import --file activity.json");
    println!("  2. Generate an insight: cadence insight <user> --kind morning");

    Ok(())
}
