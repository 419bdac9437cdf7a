//! Insight commands (insight, insights, batch)

use anyhow::Result;
use cadence_core::analysis::PopulationWindows;
use cadence_core::insights::{
    DeliveredInsight, Delivery, GenerationSource, InsightKind, InsightService,
};
use cadence_core::Database;
use chrono::{NaiveDate, Utc};

use super::truncate;

fn describe_delivery(delivered: &DeliveredInsight) -> String {
    match &delivered.delivery {
        Delivery::Generated(GenerationSource::Ai { model }) => format!("AI ({})", model),
        Delivery::Generated(GenerationSource::Template) => "template".to_string(),
        Delivery::Reused => "reused (generation limit reached)".to_string(),
    }
}

pub async fn cmd_insight(
    service: &InsightService,
    user_id: &str,
    kind: InsightKind,
    date: NaiveDate,
    json: bool,
) -> Result<()> {
    let delivered = service.insight_for(user_id, kind, date, Utc::now()).await?;

    let Some(delivered) = delivered else {
        if json {
            println!("null");
        } else if kind.is_population() {
            println!("No {} insight for {}: AI access is off or there is no shareable group pattern.", kind, user_id);
        } else {
            println!("No {} insight for {}: AI access is not enabled for this user.", kind, user_id);
        }
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&delivered)?);
        return Ok(());
    }

    println!();
    match delivered.target_date {
        Some(d) => println!("💬 {} insight for {} on {}", kind, user_id, d),
        None => println!("💬 {} insight for {}", kind, user_id),
    }
    println!("   ─────────────────────────────────────────────────────────────");
    println!();
    println!("{}", delivered.text);
    println!();
    print!("   Source: {}", describe_delivery(&delivered));
    match &delivered.record {
        Some(record) => println!("   Generation: {}", record.generation_count),
        None => println!("   (not stored)"),
    }
    println!();

    Ok(())
}

pub fn cmd_insights(
    db: &Database,
    user_id: &str,
    kind: Option<InsightKind>,
    limit: usize,
) -> Result<()> {
    let records = db.list_insights(user_id, kind, limit)?;

    if records.is_empty() {
        println!("No insights stored for {}.", user_id);
        return Ok(());
    }

    println!(
        "{:<18} {:<11} {:>3}  {:<16}  {}",
        "KIND", "DATE", "GEN", "GENERATED", "TEXT"
    );
    println!("{}", "-".repeat(100));

    for record in records {
        let date = record
            .target_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<18} {:<11} {:>3}  {:<16}  {}",
            record.insight_type.as_str(),
            date,
            record.generation_count,
            record.generated_at.format("%Y-%m-%d %H:%M"),
            truncate(&record.text.replace('\n', " "), 50)
        );
    }

    Ok(())
}

pub async fn cmd_batch(
    service: &InsightService,
    as_of: NaiveDate,
    concurrency: usize,
    json: bool,
) -> Result<()> {
    let service = service.clone().with_windows(PopulationWindows {
        concurrency: concurrency.max(1),
        ..Default::default()
    });

    if !json {
        println!("🔄 Running population analysis as of {}...", as_of);
    }

    let report = service.run_population(as_of, Utc::now()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("   Users analyzed:   {}", report.users_analyzed);
    println!(
        "   Groups:           {} ({} without a group)",
        report.clusters, report.outliers
    );
    println!("   Stage patterns:   {}", report.aggregates);
    println!();
    println!("   Generated (AI):       {}", report.generated_ai);
    println!("   Generated (template): {}", report.generated_template);
    println!("   Reused:               {}", report.reused);
    println!("   Skipped (no access):  {}", report.skipped_no_access);
    if report.failed > 0 {
        println!("   ⚠️  Failed:            {}", report.failed);
    }
    println!();
    println!("✅ Batch complete");

    Ok(())
}
