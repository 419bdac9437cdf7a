//! Core types for insight generation

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::{FeatureVector, AGGREGATE_WINDOW_DAYS, CLUSTER_WINDOW_DAYS};
use crate::models::{Stage, UserProfile};

/// Kinds of insight the generator can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    /// Start-of-day nudge
    Morning,
    /// After the day's plan is written
    PostPlan,
    /// After the evening review
    PostReflection,
    Weekly,
    Monthly,
    /// After an incident is logged
    Incident,
    /// Shared pattern of similar users
    ClusterPattern,
    /// Population pattern for the user's stage group
    AggregatePattern,
    /// Standing summary, not tied to a date
    Profile,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Morning => "morning",
            InsightKind::PostPlan => "post_plan",
            InsightKind::PostReflection => "post_reflection",
            InsightKind::Weekly => "weekly",
            InsightKind::Monthly => "monthly",
            InsightKind::Incident => "incident",
            InsightKind::ClusterPattern => "cluster_pattern",
            InsightKind::AggregatePattern => "aggregate_pattern",
            InsightKind::Profile => "profile",
        }
    }

    pub fn all() -> &'static [InsightKind] {
        &[
            InsightKind::Morning,
            InsightKind::PostPlan,
            InsightKind::PostReflection,
            InsightKind::Weekly,
            InsightKind::Monthly,
            InsightKind::Incident,
            InsightKind::ClusterPattern,
            InsightKind::AggregatePattern,
            InsightKind::Profile,
        ]
    }

    /// Whether the store keys this kind by target date
    pub fn is_date_scoped(&self) -> bool {
        !matches!(self, InsightKind::Profile)
    }

    /// Whether generating this kind needs population analysis
    pub fn is_population(&self) -> bool {
        matches!(
            self,
            InsightKind::ClusterPattern | InsightKind::AggregatePattern
        )
    }

    /// Days of history feeding this kind
    pub fn window_days(&self) -> u32 {
        match self {
            InsightKind::Monthly | InsightKind::Profile => 30,
            InsightKind::ClusterPattern => CLUSTER_WINDOW_DAYS,
            InsightKind::AggregatePattern => AGGREGATE_WINDOW_DAYS,
            InsightKind::Morning
            | InsightKind::PostPlan
            | InsightKind::PostReflection
            | InsightKind::Weekly
            | InsightKind::Incident => 7,
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(InsightKind::Morning),
            "post_plan" => Ok(InsightKind::PostPlan),
            "post_reflection" => Ok(InsightKind::PostReflection),
            "weekly" => Ok(InsightKind::Weekly),
            "monthly" => Ok(InsightKind::Monthly),
            "incident" => Ok(InsightKind::Incident),
            "cluster_pattern" => Ok(InsightKind::ClusterPattern),
            "aggregate_pattern" => Ok(InsightKind::AggregatePattern),
            "profile" => Ok(InsightKind::Profile),
            _ => Err(format!("Unknown insight kind: {}", s)),
        }
    }
}

/// One stored generation of an insight slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub id: i64,
    pub user_id: String,
    pub insight_type: InsightKind,
    pub target_date: Option<NaiveDate>,
    pub text: String,
    pub stage_context: Option<Stage>,
    pub generation_count: u32,
    pub generated_at: DateTime<Utc>,
}

/// What happened on the target date itself
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayActivity {
    pub planned: u32,
    pub completed: u32,
    pub high_priority: u32,
    pub decisions: u32,
    pub wins: Vec<String>,
    pub lessons: Vec<String>,
    pub incidents: Vec<String>,
    pub mood: Option<u8>,
    pub energy: Option<u8>,
}

/// Pattern shared by a group of similar users
#[derive(Debug, Clone, Serialize)]
pub struct GroupPattern {
    /// Already safe for user-facing text ("4 founders", "many founders")
    pub size_label: String,
    pub descriptions: Vec<String>,
}

/// Everything the generator may draw on for one insight
#[derive(Debug, Clone, Serialize)]
pub struct InsightContext {
    pub kind: InsightKind,
    pub target_date: NaiveDate,
    pub display_name: Option<String>,
    pub stage: Stage,
    pub days_in_stage: u32,
    /// Features over `kind.window_days()` ending on the target date
    pub features: FeatureVector,
    pub day: DayActivity,
    /// Generation context only; never used for classification
    pub profile: UserProfile,
    /// Present for cluster and aggregate pattern kinds
    pub group: Option<GroupPattern>,
}

/// Where a piece of generated text came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum GenerationSource {
    Ai { model: String },
    Template,
}

/// Generator output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedInsight {
    pub text: String,
    #[serde(flatten)]
    pub source: GenerationSource,
}
