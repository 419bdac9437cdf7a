//! Import command implementation

use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::import::import_file;
use cadence_core::Database;

pub fn cmd_import(db: &Database, file: &Path) -> Result<()> {
    println!("📥 Importing {}...", file.display());

    let stats = import_file(db, file)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("   Users:     {}", stats.users);
    println!("   Profiles:  {}", stats.profiles);
    println!("   Tasks:     {}", stats.tasks);
    println!("   Decisions: {}", stats.decisions);
    println!("   Reviews:   {}", stats.reviews);
    println!("   Incidents: {}", stats.incidents);
    if stats.skipped_users > 0 {
        println!("   ⚠️  Skipped {} user(s) with a blank id", stats.skipped_users);
    }

    println!("✅ Import complete");
    Ok(())
}
