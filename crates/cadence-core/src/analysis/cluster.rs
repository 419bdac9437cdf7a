//! Weighted-similarity clustering of users
//!
//! Greedy single pass: each unassigned user seeds a candidate, every later
//! unassigned user scoring at or above the threshold against the seed joins
//! it, and candidates smaller than the minimum size are dissolved. Inputs
//! are sorted by user id first so the same set of users always yields the
//! same clusters. The result still depends on that ordering; it is an
//! approximation, not an optimal partition.

use serde::Serialize;
use tracing::debug;

use super::features::{Feature, FeatureVector};

/// Minimum weighted similarity for a user to join a seed
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

/// Smallest cluster that is kept
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Description used when no pattern threshold is met
pub const BALANCED_DESCRIPTION: &str = "balanced approach";

/// Clustering parameters
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub similarity_threshold: f64,
    pub min_cluster_size: usize,
    /// Per-feature weights; sum to 1
    pub weights: Vec<(Feature, f64)>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: SIMILARITY_THRESHOLD,
            min_cluster_size: MIN_CLUSTER_SIZE,
            weights: vec![
                (Feature::TaskVolume, 0.15),
                (Feature::Completion, 0.15),
                (Feature::HighPriority, 0.10),
                (Feature::Systemize, 0.15),
                (Feature::QuickWin, 0.10),
                (Feature::IncidentRate, 0.10),
                (Feature::DecisionRate, 0.10),
                (Feature::Proactive, 0.05),
                (Feature::Focus, 0.10),
            ],
        }
    }
}

/// A user's feature vector tagged with the user id
#[derive(Debug, Clone, Serialize)]
pub struct UserFeatures {
    pub user_id: String,
    pub features: FeatureVector,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub member_user_ids: Vec<String>,
    pub common_pattern_description: String,
    /// Mean feature vector of the members
    pub centroid: FeatureVector,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusteringResult {
    pub clusters: Vec<Cluster>,
    /// Users not placed in any cluster
    pub outliers: Vec<String>,
}

impl ClusteringResult {
    /// The cluster containing a user, if any
    pub fn cluster_of(&self, user_id: &str) -> Option<&Cluster> {
        self.clusters
            .iter()
            .find(|c| c.member_user_ids.iter().any(|m| m == user_id))
    }
}

/// Weighted similarity of two feature vectors in `[0, 1]`
///
/// Each feature contributes `1 - min(|a - b| / max(a, b, 1), 1)`.
/// Symmetric in its arguments.
pub fn similarity(a: &FeatureVector, b: &FeatureVector, weights: &[(Feature, f64)]) -> f64 {
    weights
        .iter()
        .map(|&(feature, weight)| {
            let x = a.get(feature);
            let y = b.get(feature);
            let scale = x.max(y).max(1.0);
            let distance = ((x - y).abs() / scale).min(1.0);
            weight * (1.0 - distance)
        })
        .sum()
}

/// Group users into clusters of similar behavior
pub fn cluster_users(users: &[UserFeatures], config: &ClusterConfig) -> ClusteringResult {
    let mut ordered: Vec<&UserFeatures> = users.iter().collect();
    ordered.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    let mut assigned = vec![false; ordered.len()];
    let mut clusters = Vec::new();

    for seed in 0..ordered.len() {
        if assigned[seed] {
            continue;
        }

        let mut members = vec![seed];
        for candidate in (seed + 1)..ordered.len() {
            if assigned[candidate] {
                continue;
            }
            let score = similarity(
                &ordered[seed].features,
                &ordered[candidate].features,
                &config.weights,
            );
            if score >= config.similarity_threshold {
                members.push(candidate);
            }
        }

        if members.len() < config.min_cluster_size {
            continue;
        }

        for &m in &members {
            assigned[m] = true;
        }
        let centroid = FeatureVector::mean(members.iter().map(|&m| &ordered[m].features));
        clusters.push(Cluster {
            member_user_ids: members
                .iter()
                .map(|&m| ordered[m].user_id.clone())
                .collect(),
            common_pattern_description: pattern_description(&centroid),
            centroid,
        });
    }

    let outliers: Vec<String> = ordered
        .iter()
        .zip(&assigned)
        .filter(|(_, &a)| !a)
        .map(|(u, _)| u.user_id.clone())
        .collect();

    debug!(
        users = ordered.len(),
        clusters = clusters.len(),
        outliers = outliers.len(),
        "Clustering complete"
    );

    ClusteringResult { clusters, outliers }
}

/// Qualifying pattern phrases for an averaged feature vector
pub fn describe_patterns(avg: &FeatureVector) -> Vec<&'static str> {
    let mut patterns = Vec::new();
    if avg.task_volume_per_day >= 5.0 && avg.completion_rate < 0.6 {
        patterns.push("high volume, lower completion");
    }
    if avg.completion_rate >= 0.8 {
        patterns.push("consistent follow-through");
    }
    if avg.systemize_ratio >= 0.3 {
        patterns.push("investing in repeatable systems");
    }
    if avg.quick_win_ratio >= 0.5 {
        patterns.push("building momentum through quick wins");
    }
    if avg.incident_rate >= 0.5 {
        patterns.push("frequent unplanned interruptions");
    }
    if avg.proactive_decision_ratio >= 0.6 {
        patterns.push("proactive decision-making");
    }
    if avg.avg_focus_score >= 7.0 {
        patterns.push("strong focus sessions");
    }
    patterns
}

/// All qualifying patterns joined, or the balanced fallback
pub fn pattern_description(avg: &FeatureVector) -> String {
    let patterns = describe_patterns(avg);
    if patterns.is_empty() {
        BALANCED_DESCRIPTION.to_string()
    } else {
        patterns.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, f: impl FnOnce(&mut FeatureVector)) -> UserFeatures {
        let mut features = FeatureVector {
            window_days: 14,
            ..Default::default()
        };
        f(&mut features);
        UserFeatures {
            user_id: id.to_string(),
            features,
        }
    }

    fn steady(id: &str) -> UserFeatures {
        user(id, |v| {
            v.task_volume_per_day = 3.0;
            v.completion_rate = 0.9;
            v.avg_focus_score = 8.0;
        })
    }

    fn firefighter(id: &str) -> UserFeatures {
        user(id, |v| {
            v.task_volume_per_day = 9.0;
            v.completion_rate = 0.2;
            v.incident_rate = 2.0;
            v.high_priority_ratio = 1.0;
            v.quick_win_ratio = 1.0;
            v.decision_rate = 4.0;
            v.avg_focus_score = 1.0;
        })
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = ClusterConfig::default().weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_identical_is_one() {
        let a = steady("a");
        let weights = ClusterConfig::default().weights;
        assert!((similarity(&a.features, &a.features, &weights) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let weights = ClusterConfig::default().weights;
        let a = steady("a");
        let b = firefighter("b");
        let ab = similarity(&a.features, &b.features, &weights);
        let ba = similarity(&b.features, &a.features, &weights);
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
        assert!(ab < SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_small_groups_become_outliers() {
        let users = vec![steady("a"), steady("b"), firefighter("c")];
        let result = cluster_users(&users, &ClusterConfig::default());
        assert!(result.clusters.is_empty());
        assert_eq!(result.outliers.len(), 3);
    }

    #[test]
    fn test_clusters_respect_min_size_and_partition() {
        let users = vec![
            firefighter("f1"),
            steady("s3"),
            steady("s1"),
            firefighter("f2"),
            steady("s2"),
            steady("s4"),
        ];
        let result = cluster_users(&users, &ClusterConfig::default());

        assert_eq!(result.clusters.len(), 1);
        let cluster = &result.clusters[0];
        assert_eq!(cluster.member_user_ids, vec!["s1", "s2", "s3", "s4"]);
        assert!(cluster.member_user_ids.len() >= MIN_CLUSTER_SIZE);
        assert_eq!(result.outliers, vec!["f1", "f2"]);

        // Every user is in exactly one place
        for u in &users {
            let in_cluster = result.cluster_of(&u.user_id).is_some();
            let is_outlier = result.outliers.contains(&u.user_id);
            assert!(in_cluster ^ is_outlier);
        }
    }

    #[test]
    fn test_input_order_does_not_change_result() {
        let a = vec![steady("s1"), firefighter("f1"), steady("s2"), steady("s3")];
        let b = vec![steady("s3"), steady("s2"), firefighter("f1"), steady("s1")];
        let ra = cluster_users(&a, &ClusterConfig::default());
        let rb = cluster_users(&b, &ClusterConfig::default());
        assert_eq!(ra.clusters[0].member_user_ids, rb.clusters[0].member_user_ids);
        assert_eq!(ra.outliers, rb.outliers);
    }

    #[test]
    fn test_centroid_and_description() {
        let users = vec![steady("s1"), steady("s2"), steady("s3")];
        let result = cluster_users(&users, &ClusterConfig::default());
        let cluster = &result.clusters[0];
        assert_eq!(cluster.centroid.completion_rate, 0.9);
        assert_eq!(
            cluster.common_pattern_description,
            "consistent follow-through; strong focus sessions"
        );
    }

    #[test]
    fn test_description_balanced_fallback() {
        let avg = FeatureVector {
            completion_rate: 0.7,
            ..Default::default()
        };
        assert!(describe_patterns(&avg).is_empty());
        assert_eq!(pattern_description(&avg), BALANCED_DESCRIPTION);
    }

    #[test]
    fn test_description_high_volume_low_completion() {
        let avg = FeatureVector {
            task_volume_per_day: 6.0,
            completion_rate: 0.4,
            incident_rate: 0.8,
            ..Default::default()
        };
        assert_eq!(
            describe_patterns(&avg),
            vec!["high volume, lower completion", "frequent unplanned interruptions"]
        );
    }
}
