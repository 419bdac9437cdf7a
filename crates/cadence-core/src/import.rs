//! JSON activity import
//!
//! Loads users, their profiles and raw activity records from one document:
//!
//! ```json
//! {
//!   "users": [{
//!     "id": "u1",
//!     "display_name": "Ada",
//!     "ai_access": true,
//!     "profile": { "goals": ["raise a seed round"], "struggles": "saying no" },
//!     "tasks": [{ "date": "2024-03-01", "title": "Write onboarding checklist",
//!                 "priority": "high", "action": "systemize", "completed": true }],
//!     "decisions": [{ "date": "2024-03-01", "description": "Hire a contractor", "proactive": true }],
//!     "reviews": [{ "date": "2024-03-01", "mood": 7, "focus_score": 8.5, "wins": "shipped" }],
//!     "incidents": [{ "date": "2024-03-01", "description": "Payment webhook failed" }]
//!   }]
//! }
//! ```
//!
//! Records are appended; importing the same file twice duplicates activity.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{NewDecision, NewIncident, NewReview, NewTask, UserProfile};

/// Top-level import document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityImport {
    #[serde(default)]
    pub users: Vec<ImportedUser>,
}

/// One user with everything to load for them
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_true")]
    pub analysis_enabled: bool,
    #[serde(default)]
    pub ai_access: bool,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub tasks: Vec<NewTask>,
    #[serde(default)]
    pub decisions: Vec<NewDecision>,
    #[serde(default)]
    pub reviews: Vec<NewReview>,
    #[serde(default)]
    pub incidents: Vec<NewIncident>,
}

fn default_true() -> bool {
    true
}

/// Counts from one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub users: usize,
    pub profiles: usize,
    pub tasks: usize,
    pub decisions: usize,
    pub reviews: usize,
    pub incidents: usize,
    /// Users left out for having a blank id
    pub skipped_users: usize,
}

/// Parse an import document
pub fn parse_activity<R: Read>(reader: R) -> Result<ActivityImport> {
    serde_json::from_reader(reader).map_err(|e| Error::Import(format!("Invalid activity file: {}", e)))
}

/// Read and import a JSON file
pub fn import_file(db: &Database, path: &Path) -> Result<ImportStats> {
    let file = File::open(path)?;
    let data = parse_activity(BufReader::new(file))?;
    debug!(path = %path.display(), users = data.users.len(), "Parsed activity file");
    import_activity(db, &data)
}

/// Write a parsed document into the database
pub fn import_activity(db: &Database, data: &ActivityImport) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for user in &data.users {
        let id = user.id.trim();
        if id.is_empty() {
            warn!("Skipping user with blank id");
            stats.skipped_users += 1;
            continue;
        }

        db.upsert_user(
            id,
            user.display_name.as_deref(),
            user.analysis_enabled,
            user.ai_access,
        )?;
        stats.users += 1;

        if let Some(profile) = &user.profile {
            db.set_user_profile(id, profile)?;
            stats.profiles += 1;
        }

        for task in &user.tasks {
            db.insert_task(id, task)?;
        }
        for decision in &user.decisions {
            db.insert_decision(id, decision)?;
        }
        for review in &user.reviews {
            db.insert_review(id, review)?;
        }
        for incident in &user.incidents {
            db.insert_incident(id, incident)?;
        }

        stats.tasks += user.tasks.len();
        stats.decisions += user.decisions.len();
        stats.reviews += user.reviews.len();
        stats.incidents += user.incidents.len();
    }

    info!(
        users = stats.users,
        tasks = stats.tasks,
        decisions = stats.decisions,
        reviews = stats.reviews,
        incidents = stats.incidents,
        "Activity imported"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionKind, LegacyText, Priority};
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "users": [
            {
                "id": "u1",
                "display_name": "Ada",
                "ai_access": true,
                "profile": { "goals": ["raise a seed round", "hire"], "struggles": "saying no" },
                "tasks": [
                    { "date": "2024-03-01", "title": "Checklist", "priority": "high",
                      "action": "systemize", "completed": true },
                    { "date": "2024-03-01", "title": "Inbox zero" }
                ],
                "decisions": [{ "date": "2024-03-01", "description": "Hire", "proactive": true }],
                "reviews": [{ "date": "2024-03-01", "mood": 7, "wins": "shipped" }],
                "incidents": [{ "date": "2024-03-01", "description": "Webhook failed" }]
            },
            { "id": "  ", "tasks": [{ "date": "2024-03-01", "title": "lost" }] },
            { "id": "u2", "analysis_enabled": false }
        ]
    }"#;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let data = parse_activity(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.users.len(), 3);

        let u1 = &data.users[0];
        assert!(u1.analysis_enabled);
        assert_eq!(u1.tasks[0].priority, Priority::High);
        assert_eq!(u1.tasks[0].action, ActionKind::Systemize);
        assert_eq!(u1.tasks[1].priority, Priority::Medium);
        assert!(!u1.tasks[1].completed);

        let profile = u1.profile.as_ref().unwrap();
        assert_eq!(profile.struggles, LegacyText::Plain("saying no".into()));
        assert!(!data.users[2].ai_access);
    }

    #[test]
    fn test_parse_rejects_bad_json() {
        let err = parse_activity("{ users: [".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Import(_)));
    }

    #[test]
    fn test_import_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let db = Database::in_memory().unwrap();
        let stats = import_file(&db, file.path()).unwrap();

        assert_eq!(
            stats,
            ImportStats {
                users: 2,
                profiles: 1,
                tasks: 2,
                decisions: 1,
                reviews: 1,
                incidents: 1,
                skipped_users: 1,
            }
        );

        let u1 = db.get_user("u1").unwrap().unwrap();
        assert_eq!(u1.display_name.as_deref(), Some("Ada"));
        assert!(u1.ai_access);
        assert_eq!(db.list_tasks("u1", day(), day()).unwrap().len(), 2);
        assert_eq!(
            db.get_user_profile("u1").unwrap().goals.items(),
            vec!["raise a seed round", "hire"]
        );

        let analysis: Vec<_> = db
            .list_analysis_users()
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(analysis, vec!["u1"]);
    }

    #[test]
    fn test_import_missing_file() {
        let db = Database::in_memory().unwrap();
        let err = import_file(&db, Path::new("/nonexistent/activity.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
