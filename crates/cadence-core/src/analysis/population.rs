//! Population-scope analysis
//!
//! Materializes every analysis-enabled user's feature vectors before any
//! clustering or aggregation runs. Per-user loading fans out across tasks
//! with a concurrency bound; the population steps run once all of it is in.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::aggregator::ActivityWindow;
use super::anonymize::{aggregate_by_stage, AggregatePattern, AggregationConfig, StagedFeatures};
use super::cluster::{cluster_users, ClusterConfig, ClusteringResult, UserFeatures};
use super::features::{extract_features, FeatureVector};
use super::stage::classify;
use super::{AGGREGATE_WINDOW_DAYS, CLUSTER_WINDOW_DAYS, STAGE_WINDOW_DAYS};
use crate::db::Database;
use crate::error::Result;
use crate::models::Stage;

/// Window lengths and fan-out for a population run
#[derive(Debug, Clone)]
pub struct PopulationWindows {
    pub stage_days: u32,
    pub cluster_days: u32,
    pub aggregate_days: u32,
    /// Maximum users loaded at once
    pub concurrency: usize,
    pub cluster: ClusterConfig,
    pub aggregation: AggregationConfig,
}

impl Default for PopulationWindows {
    fn default() -> Self {
        Self {
            stage_days: STAGE_WINDOW_DAYS,
            cluster_days: CLUSTER_WINDOW_DAYS,
            aggregate_days: AGGREGATE_WINDOW_DAYS,
            concurrency: 8,
            cluster: ClusterConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

/// Everything one population run computed
#[derive(Debug, Clone, Serialize)]
pub struct PopulationSnapshot {
    pub as_of: NaiveDate,
    pub clustering: ClusteringResult,
    /// 30-day features with the user's current 7-day stage
    pub staged: Vec<StagedFeatures>,
    pub aggregates: Vec<AggregatePattern>,
}

struct UserVectors {
    user_id: String,
    cluster: FeatureVector,
    aggregate: FeatureVector,
    stage: Stage,
}

impl PopulationSnapshot {
    /// Load all analysis-enabled users and run clustering and aggregation
    ///
    /// A user whose data fails to load is logged and left out of the run.
    pub async fn build(db: &Database, as_of: NaiveDate, windows: &PopulationWindows) -> Result<Self> {
        let users = db.list_analysis_users()?;
        let semaphore = Arc::new(Semaphore::new(windows.concurrency.max(1)));

        let mut tasks = Vec::with_capacity(users.len());
        for user in users {
            let semaphore = Arc::clone(&semaphore);
            let db = db.clone();
            let windows = windows.clone();

            tasks.push(tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                tokio::task::spawn_blocking(move || load_user(&db, &user.id, as_of, &windows))
                    .await
            }));
        }

        let mut loaded = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(Ok(Ok(vectors))) => loaded.push(vectors),
                Ok(Ok(Err(e))) => warn!(error = %e, "Skipping user in population run"),
                Ok(Err(e)) | Err(e) => warn!(error = %e, "Population loader failed"),
            }
        }
        loaded.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        let cluster_input: Vec<UserFeatures> = loaded
            .iter()
            .map(|u| UserFeatures {
                user_id: u.user_id.clone(),
                features: u.cluster.clone(),
            })
            .collect();
        let clustering = cluster_users(&cluster_input, &windows.cluster);

        let staged: Vec<StagedFeatures> = loaded
            .into_iter()
            .map(|u| StagedFeatures {
                user_id: u.user_id,
                stage: u.stage,
                features: u.aggregate,
            })
            .collect();
        let aggregates = aggregate_by_stage(&staged, &windows.aggregation);

        info!(
            users = staged.len(),
            clusters = clustering.clusters.len(),
            aggregates = aggregates.len(),
            "Population analysis complete"
        );

        Ok(Self {
            as_of,
            clustering,
            staged,
            aggregates,
        })
    }

    /// Stage the run classified a user into
    pub fn stage_of(&self, user_id: &str) -> Option<Stage> {
        self.staged
            .iter()
            .find(|s| s.user_id == user_id)
            .map(|s| s.stage)
    }

    /// Surfaced aggregate for a stage, if its group was large enough
    pub fn aggregate_for(&self, stage: Stage) -> Option<&AggregatePattern> {
        self.aggregates.iter().find(|a| a.stage == stage)
    }
}

fn load_user(
    db: &Database,
    user_id: &str,
    as_of: NaiveDate,
    windows: &PopulationWindows,
) -> Result<UserVectors> {
    let stage_window = ActivityWindow::load_ending(db, user_id, as_of, windows.stage_days)?;
    let cluster_window = ActivityWindow::load_ending(db, user_id, as_of, windows.cluster_days)?;
    let aggregate_window =
        ActivityWindow::load_ending(db, user_id, as_of, windows.aggregate_days)?;

    Ok(UserVectors {
        user_id: user_id.to_string(),
        cluster: extract_features(&cluster_window),
        aggregate: extract_features(&aggregate_window),
        stage: classify(&extract_features(&stage_window)),
    })
}
