//! Analysis commands (features, stage)

use anyhow::{anyhow, Result};
use cadence_core::analysis::{evaluate_stage, extract_features, ActivityWindow, Feature};
use cadence_core::Database;
use chrono::{NaiveDate, Utc};

fn require_user(db: &Database, user_id: &str) -> Result<()> {
    db.get_user(user_id)?
        .map(|_| ())
        .ok_or_else(|| anyhow!("User not found: {}", user_id))
}

pub fn cmd_features(
    db: &Database,
    user_id: &str,
    end: NaiveDate,
    days: u32,
    json: bool,
) -> Result<()> {
    require_user(db, user_id)?;

    let window = ActivityWindow::load_ending(db, user_id, end, days.max(1))?;
    let features = extract_features(&window);

    if json {
        println!("{}", serde_json::to_string_pretty(&features)?);
        return Ok(());
    }

    println!();
    println!(
        "📈 Features for {} ({} to {}, {} days)",
        user_id,
        window.start,
        window.end,
        window.days()
    );
    println!("   ─────────────────────────────────────────────────────────────");

    if features.is_empty() {
        println!("   No activity in this window.");
        println!();
        return Ok(());
    }

    for feature in Feature::all() {
        println!("   {:<26} {:>8.3}", feature.as_str(), features.get(*feature));
    }
    println!();
    println!(
        "   Tasks: {} ({} completed, {} high priority)",
        features.task_count, features.completed_count, features.high_priority_count
    );
    println!(
        "   Decisions: {}   Incidents: {}   Reviews: {}",
        features.decision_count, features.incident_count, features.review_count
    );
    println!();

    Ok(())
}

pub fn cmd_stage(db: &Database, user_id: &str, json: bool) -> Result<()> {
    require_user(db, user_id)?;

    let evaluation = evaluate_stage(db, user_id, Utc::now())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
        return Ok(());
    }

    let record = &evaluation.record;
    println!();
    println!("🧭 Stage for {}", user_id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Stage:    {}", evaluation.stage);
    println!("   Meaning:  {}", evaluation.stage.plain_description());
    println!(
        "   Since:    {} ({} day{})",
        record.entered_at.format("%Y-%m-%d"),
        record.consecutive_days_in_stage,
        if record.consecutive_days_in_stage == 1 { "" } else { "s" }
    );
    println!(
        "   Last 7 days: {} tasks, {}% completed, {} incidents",
        evaluation.features.task_count,
        evaluation.features.completion_percent(),
        evaluation.features.incident_count
    );
    println!();

    Ok(())
}
