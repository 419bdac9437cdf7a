//! Cadence CLI - Behavioral pattern analysis and coaching insights
//!
//! Usage:
//!   cadence init                        Initialize database
//!   cadence import --file activity.json Import users and activity
//!   cadence insight u1 --kind morning   Generate an insight
//!   cadence batch                       Population analysis and pattern insights

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import { file } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file)
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
        Commands::Features {
            user,
            date,
            days,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let date = commands::parse_date_arg(date.as_deref())?;
            commands::cmd_features(&db, &user, date, days, json)
        }
        Commands::Stage { user, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_stage(&db, &user, json)
        }
        Commands::Insight {
            user,
            kind,
            date,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let kind = commands::parse_kind(&kind)?;
            let date = commands::parse_date_arg(date.as_deref())?;
            let service = commands::build_service(&db)?;
            commands::cmd_insight(&service, &user, kind, date, json).await
        }
        Commands::Insights { user, kind, limit } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let kind = kind.as_deref().map(commands::parse_kind).transpose()?;
            commands::cmd_insights(&db, &user, kind, limit)
        }
        Commands::Batch {
            date,
            concurrency,
            json,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let date = commands::parse_date_arg(date.as_deref())?;
            let service = commands::build_service(&db)?;
            commands::cmd_batch(&service, date, concurrency, json).await
        }
        Commands::Models { check } => commands::cmd_models(check).await,
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { kind }) => commands::cmd_prompts_show(&kind),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
