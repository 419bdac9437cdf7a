//! Activity window loading

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::{Decision, Incident, PlannedTask, Review};

/// A user's raw activity within an inclusive date range
#[derive(Debug, Clone, Serialize)]
pub struct ActivityWindow {
    pub user_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub tasks: Vec<PlannedTask>,
    pub decisions: Vec<Decision>,
    pub reviews: Vec<Review>,
    pub incidents: Vec<Incident>,
}

impl ActivityWindow {
    pub fn empty(user_id: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            start,
            end,
            tasks: Vec::new(),
            decisions: Vec::new(),
            reviews: Vec::new(),
            incidents: Vec::new(),
        }
    }

    /// Load every record the user owns within `[start, end]`
    ///
    /// An inverted range yields an empty window rather than an error.
    pub fn load(db: &Database, user_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Ok(Self::empty(user_id, start, end));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            start,
            end,
            tasks: db.list_tasks(user_id, start, end)?,
            decisions: db.list_decisions(user_id, start, end)?,
            reviews: db.list_reviews(user_id, start, end)?,
            incidents: db.list_incidents(user_id, start, end)?,
        })
    }

    /// Load the `days`-long window ending on `end`
    pub fn load_ending(db: &Database, user_id: &str, end: NaiveDate, days: u32) -> Result<Self> {
        let (start, end) = window_ending(end, days);
        Self::load(db, user_id, start, end)
    }

    /// Calendar days covered, inclusive (0 for an inverted range)
    pub fn days(&self) -> u32 {
        let span = (self.end - self.start).num_days();
        if span < 0 {
            0
        } else {
            span as u32 + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
            && self.decisions.is_empty()
            && self.reviews.is_empty()
            && self.incidents.is_empty()
    }
}

/// Inclusive `(start, end)` of a window of `days` calendar days ending on `end`
///
/// A zero-day window, or one reaching past the earliest representable date,
/// comes back inverted, which loads as empty.
pub fn window_ending(end: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let start = days
        .checked_sub(1)
        .and_then(|back| end.checked_sub_days(Days::new(u64::from(back))));

    match start {
        Some(start) => (start, end),
        None => match end.succ_opt() {
            Some(next) => (next, end),
            None => (end, end.pred_opt().unwrap_or(end)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewIncident, NewTask};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_window_ending() {
        assert_eq!(window_ending(day(7), 7), (day(1), day(7)));
        assert_eq!(window_ending(day(7), 1), (day(7), day(7)));

        let (start, end) = window_ending(day(7), 0);
        assert!(end < start);
    }

    #[test]
    fn test_oversized_window_loads_empty() {
        let (start, end) = window_ending(day(1), u32::MAX);
        assert!(end < start);

        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();
        let window = ActivityWindow::load_ending(&db, "u-1", day(1), 200_000_000).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.days(), 0);
    }

    #[test]
    fn test_window_days() {
        assert_eq!(ActivityWindow::empty("u", day(1), day(7)).days(), 7);
        assert_eq!(ActivityWindow::empty("u", day(3), day(3)).days(), 1);
        assert_eq!(ActivityWindow::empty("u", day(7), day(1)).days(), 0);
    }

    #[test]
    fn test_load_filters_owner_and_range() {
        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();
        db.upsert_user("u-2", None, true, true).unwrap();

        for (user, d) in [("u-1", 2), ("u-1", 9), ("u-2", 3)] {
            db.insert_task(
                user,
                &NewTask {
                    date: day(d),
                    title: "work".into(),
                    priority: Default::default(),
                    action: Default::default(),
                    completed: false,
                },
            )
            .unwrap();
        }
        db.insert_incident(
            "u-1",
            &NewIncident {
                date: day(4),
                description: "outage".into(),
                severity: None,
            },
        )
        .unwrap();

        let window = ActivityWindow::load_ending(&db, "u-1", day(7), 7).unwrap();
        assert_eq!(window.tasks.len(), 1);
        assert_eq!(window.incidents.len(), 1);
        assert!(window.decisions.is_empty());
        assert!(!window.is_empty());
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let db = Database::in_memory().unwrap();
        let window = ActivityWindow::load(&db, "u-1", day(7), day(1)).unwrap();
        assert!(window.is_empty());
        assert_eq!(window.days(), 0);
    }
}
