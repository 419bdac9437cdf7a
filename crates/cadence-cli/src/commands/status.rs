//! Status command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use cadence_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Cadence Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                match db.is_encrypted() {
                    Ok(true) => println!("   Cipher:    active"),
                    Ok(false) => println!("   Cipher:    inactive (file stored as plain SQLite)"),
                    Err(e) => println!("   Cipher:    unknown ({})", e),
                }
                if let Ok(stats) = db.stats() {
                    println!();
                    println!("   Users:     {}", stats.users);
                    println!("   Tasks:     {}", stats.tasks);
                    println!("   Decisions: {}", stats.decisions);
                    println!("   Reviews:   {}", stats.reviews);
                    println!("   Incidents: {}", stats.incidents);
                    println!("   Insights:  {}", stats.insights);
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}
