//! Model chain command

use anyhow::{Context, Result};
use cadence_core::ai::{AIBackend, AIClient};
use cadence_core::model_chain::{default_config_path, ModelChainConfig};

/// Show the resolved fallback chain, optionally checking the backend
pub async fn cmd_models(check: bool) -> Result<()> {
    let config = ModelChainConfig::load().context("Failed to load model chain configuration")?;

    println!();
    println!("🤖 Model Chain");
    println!("   ─────────────────────────────────────────────────────────────");
    match &config.source {
        Some(path) => println!("   Config:      {} (override)", path.display()),
        None => println!("   Config:      embedded defaults"),
    }
    println!("   Timeout:     {}s", config.timeout.as_secs());
    println!("   Temperature: {:.1}", config.temperature);
    println!();

    for (i, model) in config.chain().iter().enumerate() {
        let note = if i == 0 {
            Some("preferred")
        } else {
            config.note_for(model)
        };
        match note {
            Some(note) => println!("   {}. {:<40} {}", i + 1, model, note),
            None => println!("   {}. {}", i + 1, model),
        }
    }

    if config.source.is_none() {
        if let Some(path) = default_config_path() {
            println!();
            println!("   Override path: {}", path.display());
        }
    }

    println!();
    match AIClient::from_env() {
        Some(client) => {
            println!("   Backend: {} at {}", client.kind(), client.host());
            if check {
                if client.health_check().await {
                    println!("   ✅ Backend is reachable");
                } else {
                    println!("   ❌ Backend is not reachable");
                }
            }
        }
        None => {
            println!("   Backend: not configured (insights use templates)");
            println!("   💡 Set CADENCE_AI_HOST to enable AI-written insights");
        }
    }
    println!();

    Ok(())
}
