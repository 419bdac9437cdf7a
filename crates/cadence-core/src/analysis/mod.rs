//! Behavioral analysis over activity windows
//!
//! Per-user pieces (aggregation, feature extraction, stage classification)
//! and population pieces (clustering, anonymized aggregation). Population
//! pieces only ever see materialized feature vectors, never raw records.

pub mod aggregator;
pub mod anonymize;
pub mod cluster;
pub mod features;
pub mod population;
pub mod stage;

pub use aggregator::{window_ending, ActivityWindow};
pub use anonymize::{
    aggregate_by_stage, contributor_label, fuzz_count, AggregatePattern, AggregationConfig,
    StagedFeatures,
};
pub use cluster::{
    cluster_users, describe_patterns, pattern_description, similarity, Cluster, ClusterConfig,
    ClusteringResult, UserFeatures,
};
pub use features::{extract_features, Feature, FeatureVector};
pub use population::{PopulationSnapshot, PopulationWindows};
pub use stage::{advance_stage_record, assess_stage, classify, evaluate_stage, StageEvaluation};

/// Days of history the stage classifier looks at
pub const STAGE_WINDOW_DAYS: u32 = 7;

/// Days of history used for similarity clustering
pub const CLUSTER_WINDOW_DAYS: u32 = 14;

/// Days of history used for anonymized aggregates
pub const AGGREGATE_WINDOW_DAYS: u32 = 30;
