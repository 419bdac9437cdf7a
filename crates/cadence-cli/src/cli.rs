//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cadence - Coaching insights from how you actually work
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Behavioral pattern analysis and coaching insights for founders", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "cadence.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set CADENCE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import users, profiles and activity from a JSON file
    Import {
        /// JSON file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show database status (encryption, size, row counts)
    Status,

    /// Show a user's feature vector for a window
    Features {
        /// User ID
        user: String,

        /// Last day of the window (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        /// Window length in days
        #[arg(long, default_value = "7")]
        days: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate and store a user's current stage
    Stage {
        /// User ID
        user: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate (or reuse) an insight for a user
    Insight {
        /// User ID
        user: String,

        /// Insight kind: morning, post_plan, post_reflection, weekly, monthly,
        /// incident, cluster_pattern, aggregate_pattern, profile
        #[arg(short, long, default_value = "morning")]
        kind: String,

        /// Target date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a user's stored insights, newest first
    Insights {
        /// User ID
        user: String,

        /// Only this insight kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Run population analysis and write pattern insights
    Batch {
        /// Last day of the analysis windows (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,

        /// Maximum users processed at once
        #[arg(long, default_value = "8")]
        concurrency: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the model fallback chain
    Models {
        /// Check that the configured backend is reachable
        #[arg(long)]
        check: bool,
    },

    /// Manage prompt templates (list, show, path)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Insight kind (e.g., morning, weekly)
        kind: String,
    },

    /// Print the override directory
    Path,
}
