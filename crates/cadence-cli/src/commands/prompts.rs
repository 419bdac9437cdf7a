//! Prompts-related command implementations

use anyhow::Result;
use cadence_core::insights::InsightKind;
use cadence_core::prompts::{default_prompts_dir, PromptLibrary};

/// List all available prompts and their override status
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();
    let prompts = library.list();

    println!("Available Prompts:\n");

    // Header
    println!(
        "{:<20} {:>7}  {:>9}  {:>10}  {}",
        "KIND", "VERSION", "MAX WORDS", "MAX TOKENS", "OVERRIDE"
    );
    println!("{}", "-".repeat(70));

    for info in prompts {
        let override_status = if info.has_override {
            "✓ Custom"
        } else {
            "Default"
        };

        println!(
            "{:<20} {:>7}  {:>9}  {:>10}  {}",
            info.kind.as_str(),
            info.version,
            info.max_words,
            info.max_tokens,
            override_status
        );
    }

    println!();
    println!(
        "Override directory: {}",
        default_prompts_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    );

    println!();
    println!("To customize a prompt:");
    println!("  1. Copy the default to the override directory as <kind>.md");
    println!("  2. Edit the file with your changes");
    println!("  3. The next cadence run picks it up");

    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(kind: &str) -> Result<()> {
    let kind: InsightKind = match kind.parse() {
        Ok(kind) => kind,
        Err(_) => {
            eprintln!("Unknown prompt: {}", kind);
            eprintln!();
            eprintln!("Available prompts:");
            for kind in InsightKind::all() {
                eprintln!("  - {}", kind.as_str());
            }
            return Ok(());
        }
    };

    let mut library = PromptLibrary::new();
    let prompt = library.get(kind)?;

    println!("Prompt: {}", prompt.metadata.id);
    println!("Version: {}", prompt.metadata.version);
    println!("Max words: {}", prompt.metadata.max_words);
    println!("Max tokens: {}", prompt.metadata.max_tokens);
    println!(
        "Source: {}",
        if prompt.is_override {
            "Override"
        } else {
            "Default"
        }
    );

    if let Some(ref path) = prompt.override_path {
        println!("Override Path: {}", path.display());
    }

    println!();
    println!("--- Content ---");
    println!("{}", prompt.content);

    Ok(())
}

/// Show the path where prompt overrides should be placed
pub fn cmd_prompts_path() -> Result<()> {
    match default_prompts_dir() {
        Some(path) => {
            println!("{}", path.display());

            if !path.exists() {
                eprintln!();
                eprintln!("Note: This directory does not exist yet.");
                eprintln!("Create it to start adding custom prompts.");
            }
        }
        None => {
            eprintln!("Could not determine prompts directory.");
            eprintln!("The data directory is not available on this system.");
        }
    }

    Ok(())
}
