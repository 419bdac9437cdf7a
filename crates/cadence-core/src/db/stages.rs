//! Stage record database operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::{format_date, format_datetime, parse_date, parse_datetime, Database};
use crate::analysis::stage::advance_stage_record;
use crate::error::Result;
use crate::models::{Stage, UserStageRecord};

const SELECT_STAGE: &str = r#"
    SELECT user_id, current_stage, entered_at, consecutive_days, last_evaluated_on
    FROM user_stages WHERE user_id = ?
"#;

impl Database {
    /// Current stage record for a user, if one has been evaluated
    pub fn get_user_stage(&self, user_id: &str) -> Result<Option<UserStageRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(SELECT_STAGE, params![user_id], row_to_stage_record)
            .optional()?;
        Ok(record)
    }

    /// Record a fresh stage evaluation, updating the streak counter
    ///
    /// Reads the previous record and writes the new one inside a single
    /// immediate transaction so concurrent evaluations for the same user
    /// serialize.
    pub fn upsert_user_stage(
        &self,
        user_id: &str,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> Result<UserStageRecord> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous = tx
            .query_row(SELECT_STAGE, params![user_id], row_to_stage_record)
            .optional()?;
        let record = advance_stage_record(previous.as_ref(), user_id, stage, now);

        tx.execute(
            r#"
            INSERT INTO user_stages (user_id, current_stage, entered_at, consecutive_days, last_evaluated_on)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                current_stage = excluded.current_stage,
                entered_at = excluded.entered_at,
                consecutive_days = excluded.consecutive_days,
                last_evaluated_on = excluded.last_evaluated_on
            "#,
            params![
                record.user_id,
                record.current_stage.as_str(),
                format_datetime(&record.entered_at),
                record.consecutive_days_in_stage,
                format_date(record.last_evaluated_on)
            ],
        )?;
        tx.commit()?;

        Ok(record)
    }
}

fn row_to_stage_record(row: &rusqlite::Row) -> rusqlite::Result<UserStageRecord> {
    let stage: String = row.get(1)?;
    let entered_at: String = row.get(2)?;
    let last_evaluated_on: String = row.get(4)?;
    Ok(UserStageRecord {
        user_id: row.get(0)?,
        current_stage: stage.parse().unwrap_or(Stage::Balanced),
        entered_at: parse_datetime(&entered_at),
        consecutive_days_in_stage: row.get(3)?,
        last_evaluated_on: parse_date(&last_evaluated_on)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_stage_missing_is_none() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_user_stage("u-1").unwrap().is_none());
    }

    #[test]
    fn test_stage_streak_increments_and_resets() {
        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();

        let first = db.upsert_user_stage("u-1", Stage::Balanced, at(1)).unwrap();
        assert_eq!(first.consecutive_days_in_stage, 1);
        assert_eq!(first.entered_at, at(1));

        let second = db.upsert_user_stage("u-1", Stage::Balanced, at(2)).unwrap();
        assert_eq!(second.consecutive_days_in_stage, 2);
        assert_eq!(second.entered_at, at(1));

        let changed = db
            .upsert_user_stage("u-1", Stage::FireFighting, at(3))
            .unwrap();
        assert_eq!(changed.consecutive_days_in_stage, 1);
        assert_eq!(changed.entered_at, at(3));

        let stored = db.get_user_stage("u-1").unwrap().unwrap();
        assert_eq!(stored, changed);
    }

    #[test]
    fn test_same_day_reevaluation_keeps_streak() {
        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();

        db.upsert_user_stage("u-1", Stage::SystemBuilding, at(4))
            .unwrap();
        let again = db
            .upsert_user_stage("u-1", Stage::SystemBuilding, at(4) + Duration::hours(3))
            .unwrap();
        assert_eq!(again.consecutive_days_in_stage, 1);
    }
}
