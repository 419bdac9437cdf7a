//! Insight entry points
//!
//! Ties the pipeline together for one user (access check, generation cap,
//! stage evaluation, context, generation, store) and for a population run
//! (cluster and aggregate pattern insights for every eligible member).
//!
//! Store writes are best effort: a failed write is logged and the freshly
//! generated text is still delivered.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::analysis::{
    assess_stage, contributor_label, extract_features, ActivityWindow, PopulationSnapshot,
    PopulationWindows, StageEvaluation,
};
use crate::db::{Database, InsightSlot, StoreOutcome, GENERATION_CAP};
use crate::error::{Error, Result};
use crate::models::{Stage, User};

use super::generator::InsightGenerator;
use super::types::{
    DayActivity, GenerationSource, GroupPattern, InsightContext, InsightKind, InsightRecord,
};

/// How the delivered text was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Newly generated for this call
    Generated(GenerationSource),
    /// Slot already at its cap (or another writer won); stored text returned
    Reused,
}

/// Insight text handed back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct DeliveredInsight {
    pub user_id: String,
    pub kind: InsightKind,
    pub target_date: Option<NaiveDate>,
    pub text: String,
    pub delivery: Delivery,
    /// Stored generation; `None` if the write failed
    pub record: Option<InsightRecord>,
}

/// Totals from one population batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub users_analyzed: usize,
    pub clusters: usize,
    pub outliers: usize,
    pub aggregates: usize,
    pub generated_ai: usize,
    pub generated_template: usize,
    pub reused: usize,
    pub skipped_no_access: usize,
    pub failed: usize,
}

/// Per-user and population insight generation over one database
#[derive(Clone)]
pub struct InsightService {
    db: Database,
    generator: InsightGenerator,
    windows: PopulationWindows,
}

impl InsightService {
    pub fn new(db: Database, generator: InsightGenerator) -> Self {
        Self {
            db,
            generator,
            windows: PopulationWindows::default(),
        }
    }

    pub fn with_windows(mut self, windows: PopulationWindows) -> Self {
        self.windows = windows;
        self
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn generator(&self) -> &InsightGenerator {
        &self.generator
    }

    /// Produce (or reuse) the insight for one user, kind and date
    ///
    /// Returns `Ok(None)` without generating anything when the user lacks AI
    /// access, or when a population kind has no shareable pattern for them.
    pub async fn insight_for(
        &self,
        user_id: &str,
        kind: InsightKind,
        target_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveredInsight>> {
        let user = self
            .db
            .get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("user {}", user_id)))?;

        if !user.ai_access {
            info!(user_id, kind = %kind, "AI access not enabled, no insight generated");
            return Ok(None);
        }

        let group = if kind.is_population() {
            let snapshot = PopulationSnapshot::build(&self.db, target_date, &self.windows).await?;
            match group_for(&snapshot, &self.windows, kind, user_id) {
                Some(group) => Some(group),
                None => {
                    info!(user_id, kind = %kind, "No shareable group pattern for user");
                    return Ok(None);
                }
            }
        } else {
            None
        };

        self.deliver(&user, kind, target_date, now, group)
            .await
            .map(Some)
    }

    /// Assemble the generation context for a user without generating
    pub fn build_context(
        &self,
        user: &User,
        kind: InsightKind,
        target_date: NaiveDate,
        evaluation: &StageEvaluation,
        group: Option<GroupPattern>,
    ) -> Result<InsightContext> {
        let window = ActivityWindow::load_ending(&self.db, &user.id, target_date, kind.window_days())?;
        let today = ActivityWindow::load(&self.db, &user.id, target_date, target_date)?;

        Ok(InsightContext {
            kind,
            target_date,
            display_name: user.display_name.clone(),
            stage: evaluation.stage,
            days_in_stage: evaluation.record.consecutive_days_in_stage,
            features: extract_features(&window),
            day: day_activity(&today),
            profile: self.db.get_user_profile(&user.id)?,
            group,
        })
    }

    async fn deliver(
        &self,
        user: &User,
        kind: InsightKind,
        target_date: NaiveDate,
        now: DateTime<Utc>,
        group: Option<GroupPattern>,
    ) -> Result<DeliveredInsight> {
        let slot = InsightSlot::new(user.id.as_str(), kind, target_date);

        // Skip generation entirely once the slot is full
        if let Some(latest) = self.db.latest_insight(&slot)? {
            if latest.generation_count >= GENERATION_CAP {
                debug!(user_id = %user.id, kind = %kind, "Generation cap reached, reusing text");
                return Ok(reused(&slot, latest));
            }
        }

        // Nothing is written until the insight itself is stored
        let evaluation = assess_stage(&self.db, &user.id, target_date, now)?;
        let ctx = self.build_context(user, kind, target_date, &evaluation, group)?;
        let generated = self.generator.generate(&ctx).await;

        let stored = self.db.record_insight_generation(
            &slot,
            &generated.text,
            Some(evaluation.stage),
            now,
        );
        if stored.is_ok() {
            self.persist_stage(&user.id, evaluation.stage, now);
        }

        match stored {
            Ok(StoreOutcome::Inserted(record)) => {
                info!(
                    user_id = %user.id,
                    kind = %kind,
                    generation = record.generation_count,
                    "Insight stored"
                );
                Ok(DeliveredInsight {
                    user_id: slot.user_id,
                    kind,
                    target_date: slot.target_date,
                    text: generated.text,
                    delivery: Delivery::Generated(generated.source),
                    record: Some(record),
                })
            }
            Ok(StoreOutcome::CapReached(record)) | Ok(StoreOutcome::Conflict(record)) => {
                debug!(user_id = %user.id, kind = %kind, "Slot filled concurrently, reusing text");
                Ok(reused(&slot, record))
            }
            Err(e) => {
                warn!(user_id = %user.id, kind = %kind, error = %e, "Failed to store insight");
                Ok(DeliveredInsight {
                    user_id: slot.user_id,
                    kind,
                    target_date: slot.target_date,
                    text: generated.text,
                    delivery: Delivery::Generated(generated.source),
                    record: None,
                })
            }
        }
    }

    /// Best-effort stage write after an insight has been stored
    fn persist_stage(&self, user_id: &str, stage: Stage, now: DateTime<Utc>) {
        if let Err(e) = self.db.upsert_user_stage(user_id, stage, now) {
            warn!(user_id, stage = stage.as_str(), error = %e, "Failed to store stage");
        }
    }

    /// Population run: analyze everyone, then write pattern insights
    ///
    /// Cluster members get a `cluster_pattern` insight; members of surfaced
    /// stage groups get an `aggregate_pattern` insight. Users without AI
    /// access are counted and skipped.
    pub async fn run_population(&self, as_of: NaiveDate, now: DateTime<Utc>) -> Result<BatchReport> {
        let snapshot = PopulationSnapshot::build(&self.db, as_of, &self.windows).await?;

        let mut report = BatchReport {
            users_analyzed: snapshot.staged.len(),
            clusters: snapshot.clustering.clusters.len(),
            outliers: snapshot.clustering.outliers.len(),
            aggregates: snapshot.aggregates.len(),
            ..Default::default()
        };

        let mut targets = Vec::new();
        for staged in &snapshot.staged {
            for kind in [InsightKind::ClusterPattern, InsightKind::AggregatePattern] {
                if let Some(group) = group_for(&snapshot, &self.windows, kind, &staged.user_id) {
                    targets.push((staged.user_id.clone(), kind, group));
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.windows.concurrency.max(1)));
        let mut tasks = Vec::with_capacity(targets.len());

        for (user_id, kind, group) in targets {
            let user = match self.db.get_user(&user_id) {
                Ok(Some(user)) if user.ai_access => user,
                Ok(_) => {
                    report.skipped_no_access += 1;
                    continue;
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Failed to load user for batch");
                    report.failed += 1;
                    continue;
                }
            };

            let service = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.push(tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                service.deliver(&user, kind, as_of, now, Some(group)).await
            }));
        }

        for task in tasks {
            match task.await {
                Ok(Ok(delivered)) => match delivered.delivery {
                    Delivery::Generated(GenerationSource::Ai { .. }) => report.generated_ai += 1,
                    Delivery::Generated(GenerationSource::Template) => {
                        report.generated_template += 1
                    }
                    Delivery::Reused => report.reused += 1,
                },
                Ok(Err(e)) => {
                    warn!(error = %e, "Batch insight failed");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Batch task failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            generated_ai = report.generated_ai,
            generated_template = report.generated_template,
            reused = report.reused,
            skipped = report.skipped_no_access,
            failed = report.failed,
            "Population batch complete"
        );
        Ok(report)
    }
}

fn reused(slot: &InsightSlot, record: InsightRecord) -> DeliveredInsight {
    DeliveredInsight {
        user_id: slot.user_id.clone(),
        kind: slot.kind,
        target_date: slot.target_date,
        text: record.text.clone(),
        delivery: Delivery::Reused,
        record: Some(record),
    }
}

/// The shareable pattern a population kind would talk about for a user
fn group_for(
    snapshot: &PopulationSnapshot,
    windows: &PopulationWindows,
    kind: InsightKind,
    user_id: &str,
) -> Option<GroupPattern> {
    match kind {
        InsightKind::ClusterPattern => {
            let cluster = snapshot.clustering.cluster_of(user_id)?;
            // Everyone else in the group; the user is not one of "them"
            let others = cluster.member_user_ids.len().saturating_sub(1);
            Some(GroupPattern {
                size_label: contributor_label(others, &windows.aggregation),
                descriptions: cluster
                    .common_pattern_description
                    .split("; ")
                    .map(String::from)
                    .collect(),
            })
        }
        InsightKind::AggregatePattern => {
            let stage = snapshot.stage_of(user_id)?;
            let aggregate = snapshot.aggregate_for(stage)?;
            Some(GroupPattern {
                size_label: aggregate.contributor_label.clone(),
                descriptions: aggregate.descriptions.clone(),
            })
        }
        _ => None,
    }
}

fn day_activity(today: &ActivityWindow) -> DayActivity {
    let reviews = &today.reviews;
    DayActivity {
        planned: today.tasks.len() as u32,
        completed: today.tasks.iter().filter(|t| t.completed).count() as u32,
        high_priority: today
            .tasks
            .iter()
            .filter(|t| t.priority == crate::models::Priority::High)
            .count() as u32,
        decisions: today.decisions.len() as u32,
        wins: reviews
            .iter()
            .flat_map(|r| r.wins.items())
            .map(String::from)
            .collect(),
        lessons: reviews
            .iter()
            .flat_map(|r| r.lessons.items())
            .map(String::from)
            .collect(),
        incidents: today
            .incidents
            .iter()
            .map(|i| i.description.clone())
            .collect(),
        mood: reviews.iter().rev().find_map(|r| r.mood),
        energy: reviews.iter().rev().find_map(|r| r.energy),
    }
}
