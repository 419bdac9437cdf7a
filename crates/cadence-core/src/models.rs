//! Domain models for Cadence
//!
//! Raw activity records (tasks, decisions, reviews, incidents), users and their
//! profiles, and the behavioral stage types shared by the analysis and insight
//! modules.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A user known to the analysis pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    /// Included in population-scope analysis (clustering, aggregates)
    pub analysis_enabled: bool,
    /// Eligible for AI-backed generation (derived from subscription tier upstream)
    pub ai_access: bool,
    pub created_at: DateTime<Utc>,
}

/// Free-text profile context used only when generating text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub goals: LegacyText,
    #[serde(default)]
    pub struggles: LegacyText,
    #[serde(default)]
    pub hobbies: LegacyText,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.struggles.is_empty() && self.hobbies.is_empty()
    }
}

/// Free-text field whose stored shape varies between rows.
///
/// Older rows hold a plain string, newer rows a JSON-encoded list of strings.
/// Both are normalized here, at the storage boundary, so nothing downstream
/// has to guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyText {
    Plain(String),
    List(Vec<String>),
}

impl Default for LegacyText {
    fn default() -> Self {
        LegacyText::List(Vec::new())
    }
}

impl LegacyText {
    /// Normalize a raw column value.
    ///
    /// A value that parses as a JSON list of strings becomes `List`; anything
    /// else is kept verbatim as a single `Plain` item. Never fails.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return LegacyText::default();
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return LegacyText::default();
        }
        if trimmed.starts_with('[') {
            if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
                return LegacyText::List(items);
            }
        }
        LegacyText::Plain(trimmed.to_string())
    }

    /// Serialize for storage (lists as JSON, plain text verbatim)
    pub fn to_raw(&self) -> Option<String> {
        match self {
            LegacyText::Plain(s) if s.trim().is_empty() => None,
            LegacyText::Plain(s) => Some(s.clone()),
            LegacyText::List(items) if items.is_empty() => None,
            LegacyText::List(items) => serde_json::to_string(items).ok(),
        }
    }

    /// Non-empty items, trimmed
    pub fn items(&self) -> Vec<&str> {
        match self {
            LegacyText::Plain(s) => vec![s.trim()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect(),
            LegacyText::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// Items joined with `sep` (empty string when there are none)
    pub fn joined(&self, sep: &str) -> String {
        self.items().join(sep)
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// What kind of action a planned task represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Builds a repeatable process, checklist, or automation
    Systemize,
    /// Small, fast task done for momentum
    QuickWin,
    /// Anything else
    #[default]
    Standard,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Systemize => "systemize",
            ActionKind::QuickWin => "quick_win",
            ActionKind::Standard => "standard",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "systemize" => Ok(ActionKind::Systemize),
            "quick_win" => Ok(ActionKind::QuickWin),
            "standard" => Ok(ActionKind::Standard),
            _ => Err(format!("Unknown action kind: {}", s)),
        }
    }
}

/// A planned task for a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate,
    pub title: String,
    pub priority: Priority,
    pub action: ActionKind,
    pub completed: bool,
}

/// A task to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub date: NaiveDate,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub action: ActionKind,
    #[serde(default)]
    pub completed: bool,
}

/// A logged decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Made ahead of need rather than in reaction to a problem
    pub proactive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDecision {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub proactive: bool,
}

/// A mood/energy check-in with reflection notes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate,
    /// 1-10
    pub mood: Option<u8>,
    /// 1-10
    pub energy: Option<u8>,
    /// 0-10
    pub focus_score: Option<f64>,
    pub wins: LegacyText,
    pub lessons: LegacyText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub date: NaiveDate,
    #[serde(default)]
    pub mood: Option<u8>,
    #[serde(default)]
    pub energy: Option<u8>,
    #[serde(default)]
    pub focus_score: Option<f64>,
    #[serde(default)]
    pub wins: LegacyText,
    #[serde(default)]
    pub lessons: LegacyText,
}

/// An unplanned problem the user had to deal with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub user_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Behavioral stage (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FireFighting,
    SystemBuilding,
    StrategicGrowth,
    MomentumBuilding,
    Balanced,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FireFighting => "fire_fighting",
            Stage::SystemBuilding => "system_building",
            Stage::StrategicGrowth => "strategic_growth",
            Stage::MomentumBuilding => "momentum_building",
            Stage::Balanced => "balanced",
        }
    }

    /// Get all stages
    pub fn all() -> &'static [Stage] {
        &[
            Stage::FireFighting,
            Stage::SystemBuilding,
            Stage::StrategicGrowth,
            Stage::MomentumBuilding,
            Stage::Balanced,
        ]
    }

    /// User-facing phrasing, free of internal stage codes
    pub fn plain_description(&self) -> &'static str {
        match self {
            Stage::FireFighting => "a stretch where unplanned problems are taking a lot of your time",
            Stage::SystemBuilding => "a stretch of putting repeatable processes in place",
            Stage::StrategicGrowth => "a stretch of confident decisions and strong follow-through",
            Stage::MomentumBuilding => "a stretch of building momentum through small, fast wins",
            Stage::Balanced => "a steady mix of planned work and reflection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fire_fighting" => Ok(Stage::FireFighting),
            "system_building" => Ok(Stage::SystemBuilding),
            "strategic_growth" => Ok(Stage::StrategicGrowth),
            "momentum_building" => Ok(Stage::MomentumBuilding),
            "balanced" => Ok(Stage::Balanced),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Persisted stage with its streak counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStageRecord {
    pub user_id: String,
    pub current_stage: Stage,
    pub entered_at: DateTime<Utc>,
    pub consecutive_days_in_stage: u32,
    pub last_evaluated_on: NaiveDate,
}
