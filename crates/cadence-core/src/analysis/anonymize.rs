//! Anonymized per-stage aggregates
//!
//! A stage group smaller than `min_users` produces nothing at all. Once a
//! group reaches `max_specificity` its size is only ever described with a
//! vague quantifier, and the numeric count carried alongside is coarsened.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::cluster::describe_patterns;
use super::features::FeatureVector;
use crate::models::Stage;

/// Smallest stage group an aggregate may be computed for
pub const MIN_USERS_FOR_AGGREGATE: usize = 5;

/// Group size from which the literal count is never shown
pub const MAX_SPECIFICITY: usize = 10;

/// Group size at which confidence saturates
const FULL_CONFIDENCE_USERS: f64 = 20.0;

const VAGUE_QUANTIFIER: &str = "many founders";

#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub min_users: usize,
    pub max_specificity: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_users: MIN_USERS_FOR_AGGREGATE,
            max_specificity: MAX_SPECIFICITY,
        }
    }
}

/// A user's 30-day features together with their classified stage
#[derive(Debug, Clone, Serialize)]
pub struct StagedFeatures {
    pub user_id: String,
    pub stage: Stage,
    pub features: FeatureVector,
}

/// Population-level pattern for one stage
#[derive(Debug, Clone, Serialize)]
pub struct AggregatePattern {
    pub stage: Stage,
    pub descriptions: Vec<String>,
    /// Exact below `max_specificity`, otherwise rounded down to a multiple of 5
    pub contributor_count: usize,
    /// Safe to place in user-facing text
    pub contributor_label: String,
    pub confidence: f64,
    pub average: FeatureVector,
}

/// Coarsen a group size so large groups are never reported exactly
pub fn fuzz_count(n: usize, config: &AggregationConfig) -> usize {
    if n < config.max_specificity {
        n
    } else {
        n / 5 * 5
    }
}

/// Human phrasing for a group size
pub fn contributor_label(n: usize, config: &AggregationConfig) -> String {
    if n >= config.max_specificity {
        VAGUE_QUANTIFIER.to_string()
    } else if n == 1 {
        "1 founder".to_string()
    } else {
        format!("{} founders", n)
    }
}

/// Aggregate features per stage, skipping groups below the minimum
///
/// Patterns come back in stage order.
pub fn aggregate_by_stage(
    users: &[StagedFeatures],
    config: &AggregationConfig,
) -> Vec<AggregatePattern> {
    let mut groups: BTreeMap<Stage, Vec<&FeatureVector>> = BTreeMap::new();
    for user in users {
        groups.entry(user.stage).or_default().push(&user.features);
    }

    groups
        .into_iter()
        .filter_map(|(stage, vectors)| {
            let n = vectors.len();
            if n < config.min_users {
                debug!(
                    stage = stage.as_str(),
                    "Stage group below contributor minimum, skipped"
                );
                return None;
            }

            let average = FeatureVector::mean(vectors.iter().copied());
            let descriptions = describe_patterns(&average)
                .into_iter()
                .map(String::from)
                .collect();

            Some(AggregatePattern {
                stage,
                descriptions,
                contributor_count: fuzz_count(n, config),
                contributor_label: contributor_label(n, config),
                confidence: (n as f64 / FULL_CONFIDENCE_USERS).min(1.0),
                average,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(n: usize, stage: Stage) -> Vec<StagedFeatures> {
        (0..n)
            .map(|i| StagedFeatures {
                user_id: format!("{:?}-{}", stage, i),
                stage,
                features: FeatureVector {
                    completion_rate: 0.85,
                    window_days: 30,
                    ..Default::default()
                },
            })
            .collect()
    }

    #[test]
    fn test_four_contributors_yield_nothing() {
        let users = staged(4, Stage::SystemBuilding);
        assert!(aggregate_by_stage(&users, &AggregationConfig::default()).is_empty());
    }

    #[test]
    fn test_five_contributors_yield_aggregate() {
        let users = staged(5, Stage::SystemBuilding);
        let patterns = aggregate_by_stage(&users, &AggregationConfig::default());
        assert_eq!(patterns.len(), 1);

        let p = &patterns[0];
        assert_eq!(p.stage, Stage::SystemBuilding);
        assert_eq!(p.contributor_count, 5);
        assert_eq!(p.contributor_label, "5 founders");
        assert_eq!(p.descriptions, vec!["consistent follow-through"]);
        assert!((p.confidence - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_groups_evaluated_independently() {
        let mut users = staged(6, Stage::Balanced);
        users.extend(staged(3, Stage::FireFighting));
        let patterns = aggregate_by_stage(&users, &AggregationConfig::default());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].stage, Stage::Balanced);
    }

    #[test]
    fn test_large_groups_never_show_literal_count() {
        let users = staged(23, Stage::MomentumBuilding);
        let p = &aggregate_by_stage(&users, &AggregationConfig::default())[0];
        assert_eq!(p.contributor_label, "many founders");
        assert!(!p.contributor_label.contains("23"));
        assert_eq!(p.contributor_count, 20);
        assert_eq!(p.confidence, 1.0);
    }

    #[test]
    fn test_fuzz_and_label_boundaries() {
        let config = AggregationConfig::default();
        assert_eq!(fuzz_count(9, &config), 9);
        assert_eq!(fuzz_count(10, &config), 10);
        assert_eq!(fuzz_count(14, &config), 10);
        assert_eq!(contributor_label(9, &config), "9 founders");
        assert_eq!(contributor_label(10, &config), "many founders");
    }
}
