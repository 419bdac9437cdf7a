//! Raw activity record operations (tasks, decisions, reviews, incidents)
//!
//! Reads are always filtered on the owning user and an inclusive date range.

use chrono::NaiveDate;
use rusqlite::params;

use super::{format_date, parse_date, Database};
use crate::error::Result;
use crate::models::{
    Decision, Incident, LegacyText, NewDecision, NewIncident, NewReview, NewTask, PlannedTask,
    Review,
};

impl Database {
    /// Insert a planned task
    pub fn insert_task(&self, user_id: &str, task: &NewTask) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO tasks (user_id, date, title, priority, action, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                user_id,
                format_date(task.date),
                task.title,
                task.priority.as_str(),
                task.action.as_str(),
                task.completed
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a decision
    pub fn insert_decision(&self, user_id: &str, decision: &NewDecision) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO decisions (user_id, date, description, proactive) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                format_date(decision.date),
                decision.description,
                decision.proactive
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a mood/energy review
    pub fn insert_review(&self, user_id: &str, review: &NewReview) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO reviews (user_id, date, mood, energy, focus_score, wins, lessons)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                user_id,
                format_date(review.date),
                review.mood,
                review.energy,
                review.focus_score,
                review.wins.to_raw(),
                review.lessons.to_raw()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert an incident
    pub fn insert_incident(&self, user_id: &str, incident: &NewIncident) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO incidents (user_id, date, description, severity) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                format_date(incident.date),
                incident.description,
                incident.severity
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Tasks for a user within [start, end]
    pub fn list_tasks(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PlannedTask>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, date, title, priority, action, completed
            FROM tasks
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date, id
            "#,
        )?;
        let rows = stmt.query_map(
            params![user_id, format_date(start), format_date(end)],
            |row| {
                let date: String = row.get(2)?;
                let priority: String = row.get(4)?;
                let action: String = row.get(5)?;
                Ok(PlannedTask {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    date: parse_date(&date)?,
                    title: row.get(3)?,
                    priority: priority.parse().unwrap_or_default(),
                    action: action.parse().unwrap_or_default(),
                    completed: row.get(6)?,
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Decisions for a user within [start, end]
    pub fn list_decisions(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Decision>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, date, description, proactive
            FROM decisions
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date, id
            "#,
        )?;
        let rows = stmt.query_map(
            params![user_id, format_date(start), format_date(end)],
            |row| {
                let date: String = row.get(2)?;
                Ok(Decision {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    date: parse_date(&date)?,
                    description: row.get(3)?,
                    proactive: row.get(4)?,
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Reviews for a user within [start, end]
    pub fn list_reviews(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Review>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, date, mood, energy, focus_score, wins, lessons
            FROM reviews
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date, id
            "#,
        )?;
        let rows = stmt.query_map(
            params![user_id, format_date(start), format_date(end)],
            |row| {
                let date: String = row.get(2)?;
                let wins: Option<String> = row.get(6)?;
                let lessons: Option<String> = row.get(7)?;
                Ok(Review {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    date: parse_date(&date)?,
                    mood: row.get(3)?,
                    energy: row.get(4)?,
                    focus_score: row.get(5)?,
                    wins: LegacyText::from_raw(wins.as_deref()),
                    lessons: LegacyText::from_raw(lessons.as_deref()),
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Incidents for a user within [start, end]
    pub fn list_incidents(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Incident>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, date, description, severity
            FROM incidents
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date, id
            "#,
        )?;
        let rows = stmt.query_map(
            params![user_id, format_date(start), format_date(end)],
            |row| {
                let date: String = row.get(2)?;
                Ok(Incident {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    date: parse_date(&date)?,
                    description: row.get(3)?,
                    severity: row.get(4)?,
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
