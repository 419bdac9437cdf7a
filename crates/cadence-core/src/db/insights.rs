//! Insight generation store
//!
//! Insights are append-only. Each row is one generation of a logical slot
//! `(user_id, insight_type, target_date)`; type-only kinds use a NULL date.
//! A slot accepts at most [`GENERATION_CAP`] generations, after which the
//! newest existing text is handed back instead of writing.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{format_date, format_datetime, parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::insights::{InsightKind, InsightRecord};
use crate::models::Stage;

/// Maximum generations per slot
pub const GENERATION_CAP: u32 = 3;

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, insight_type, target_date, text, stage_context, generation_count, generated_at
    FROM insights
"#;

/// Key of a logical insight slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InsightSlot {
    pub user_id: String,
    pub kind: InsightKind,
    /// Always `None` for kinds that are not date-scoped
    pub target_date: Option<NaiveDate>,
}

impl InsightSlot {
    /// Build a slot key; the date is dropped for type-only kinds
    pub fn new(user_id: impl Into<String>, kind: InsightKind, target_date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            target_date: kind.is_date_scoped().then_some(target_date),
        }
    }

    fn date_key(&self) -> String {
        self.target_date.map(format_date).unwrap_or_default()
    }
}

/// Result of asking the store to record a generation
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOutcome {
    /// A new generation was written
    Inserted(InsightRecord),
    /// The slot is full; this is its newest record
    CapReached(InsightRecord),
    /// Another writer recorded the same generation first; this is its record
    Conflict(InsightRecord),
}

impl StoreOutcome {
    pub fn record(&self) -> &InsightRecord {
        match self {
            StoreOutcome::Inserted(r) | StoreOutcome::CapReached(r) | StoreOutcome::Conflict(r) => r,
        }
    }

    /// Text the caller should present
    pub fn text(&self) -> &str {
        &self.record().text
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, StoreOutcome::Inserted(_))
    }
}

impl Database {
    /// Newest generation for a slot
    pub fn latest_insight(&self, slot: &InsightSlot) -> Result<Option<InsightRecord>> {
        let conn = self.conn()?;
        latest_in(&conn, slot)
    }

    /// Record a new generation for a slot, honoring the cap
    ///
    /// The cap check and the insert run in one immediate transaction, so two
    /// concurrent requests for the same slot cannot both slip under the cap.
    /// The unique `(slot, generation_count)` index backs this up across
    /// processes: a losing writer re-reads and gets `Conflict`.
    pub fn record_insight_generation(
        &self,
        slot: &InsightSlot,
        text: &str,
        stage_context: Option<Stage>,
        generated_at: DateTime<Utc>,
    ) -> Result<StoreOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous = latest_in(&tx, slot)?;
        if let Some(existing) = previous.as_ref() {
            if existing.generation_count >= GENERATION_CAP {
                debug!(
                    user_id = %slot.user_id,
                    kind = slot.kind.as_str(),
                    generation = existing.generation_count,
                    "Insight slot at generation cap"
                );
                return Ok(StoreOutcome::CapReached(existing.clone()));
            }
        }

        let generation_count = previous.map(|r| r.generation_count + 1).unwrap_or(1);
        let inserted = tx.execute(
            r#"
            INSERT INTO insights (user_id, insight_type, target_date, text, stage_context, generation_count, generated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                slot.user_id,
                slot.kind.as_str(),
                slot.target_date.map(format_date),
                text,
                stage_context.map(|s| s.as_str()),
                generation_count,
                format_datetime(&generated_at)
            ],
        );

        match inserted {
            Ok(_) => {
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(StoreOutcome::Inserted(InsightRecord {
                    id,
                    user_id: slot.user_id.clone(),
                    insight_type: slot.kind,
                    target_date: slot.target_date,
                    text: text.to_string(),
                    stage_context,
                    generation_count,
                    generated_at: parse_datetime(&format_datetime(&generated_at)),
                }))
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                drop(tx);
                let winner = self.latest_insight(slot)?.ok_or_else(|| {
                    crate::Error::InvalidData("Insight conflict without a stored record".into())
                })?;
                Ok(StoreOutcome::Conflict(winner))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All generations for a slot, oldest first
    pub fn list_slot_generations(&self, slot: &InsightSlot) -> Result<Vec<InsightRecord>> {
        let conn = self.conn()?;
        let sql = format!(
            "{} WHERE user_id = ?1 AND insight_type = ?2 AND COALESCE(target_date, '') = ?3 ORDER BY generation_count, id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![slot.user_id, slot.kind.as_str(), slot.date_key()],
            row_to_insight,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// A user's insight history, newest first
    pub fn list_insights(
        &self,
        user_id: &str,
        kind: Option<InsightKind>,
        limit: usize,
    ) -> Result<Vec<InsightRecord>> {
        let conn = self.conn()?;

        let insights = if let Some(kind) = kind {
            let sql = format!(
                "{} WHERE user_id = ?1 AND insight_type = ?2 ORDER BY generated_at DESC, id DESC LIMIT ?3",
                SELECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![user_id, kind.as_str(), limit as i64],
                row_to_insight,
            )?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            let sql = format!(
                "{} WHERE user_id = ?1 ORDER BY generated_at DESC, id DESC LIMIT ?2",
                SELECT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id, limit as i64], row_to_insight)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        Ok(insights)
    }
}

fn latest_in(conn: &rusqlite::Connection, slot: &InsightSlot) -> Result<Option<InsightRecord>> {
    let sql = format!(
        "{} WHERE user_id = ?1 AND insight_type = ?2 AND COALESCE(target_date, '') = ?3 ORDER BY generation_count DESC, id DESC LIMIT 1",
        SELECT_COLUMNS
    );
    let record = conn
        .query_row(
            &sql,
            params![slot.user_id, slot.kind.as_str(), slot.date_key()],
            row_to_insight,
        )
        .optional()?;
    Ok(record)
}

fn row_to_insight(row: &rusqlite::Row) -> rusqlite::Result<InsightRecord> {
    let kind: String = row.get(2)?;
    let target_date: Option<String> = row.get(3)?;
    let stage_context: Option<String> = row.get(5)?;
    let generated_at: String = row.get(7)?;

    let insight_type = kind.parse::<InsightKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(crate::Error::InvalidData(e)),
        )
    })?;

    Ok(InsightRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        insight_type,
        target_date: target_date.as_deref().map(parse_date).transpose()?,
        text: row.get(4)?,
        stage_context: stage_context.and_then(|s| s.parse().ok()),
        generation_count: row.get(6)?,
        generated_at: parse_datetime(&generated_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn march(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap()
    }

    #[test]
    fn test_first_generation_starts_at_one() {
        let db = Database::in_memory().unwrap();
        let slot = InsightSlot::new("u-1", InsightKind::Morning, march(1));

        assert!(db.latest_insight(&slot).unwrap().is_none());

        let outcome = db
            .record_insight_generation(&slot, "first", Some(Stage::Balanced), now())
            .unwrap();
        assert!(outcome.was_inserted());
        assert_eq!(outcome.record().generation_count, 1);
        assert_eq!(outcome.record().stage_context, Some(Stage::Balanced));
    }

    #[test]
    fn test_fourth_generation_returns_third_text() {
        let db = Database::in_memory().unwrap();
        let slot = InsightSlot::new("u-1", InsightKind::Morning, march(1));

        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            let outcome = db
                .record_insight_generation(&slot, text, None, now())
                .unwrap();
            assert!(outcome.was_inserted());
            assert_eq!(outcome.record().generation_count, i as u32 + 1);
        }

        let fourth = db
            .record_insight_generation(&slot, "four", None, now())
            .unwrap();
        assert!(matches!(fourth, StoreOutcome::CapReached(_)));
        assert_eq!(fourth.text(), "three");
        assert_eq!(fourth.record().generation_count, 3);

        let all = db.list_slot_generations(&slot).unwrap();
        assert_eq!(all.len(), 3);
        let counts: Vec<u32> = all.iter().map(|r| r.generation_count).collect();
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[test]
    fn test_slots_are_independent() {
        let db = Database::in_memory().unwrap();
        let morning = InsightSlot::new("u-1", InsightKind::Morning, march(1));
        let next_day = InsightSlot::new("u-1", InsightKind::Morning, march(2));
        let weekly = InsightSlot::new("u-1", InsightKind::Weekly, march(1));
        let other_user = InsightSlot::new("u-2", InsightKind::Morning, march(1));

        for _ in 0..3 {
            db.record_insight_generation(&morning, "m", None, now())
                .unwrap();
        }
        for slot in [&next_day, &weekly, &other_user] {
            let outcome = db.record_insight_generation(slot, "x", None, now()).unwrap();
            assert!(outcome.was_inserted());
            assert_eq!(outcome.record().generation_count, 1);
        }
    }

    #[test]
    fn test_type_only_slot_ignores_date() {
        let db = Database::in_memory().unwrap();
        let a = InsightSlot::new("u-1", InsightKind::Profile, march(1));
        let b = InsightSlot::new("u-1", InsightKind::Profile, march(20));
        assert_eq!(a, b);
        assert!(a.target_date.is_none());

        db.record_insight_generation(&a, "profile v1", None, now())
            .unwrap();
        let second = db
            .record_insight_generation(&b, "profile v2", None, now())
            .unwrap();
        assert_eq!(second.record().generation_count, 2);
        assert!(second.record().target_date.is_none());
    }

    #[test]
    fn test_list_insights_newest_first() {
        let db = Database::in_memory().unwrap();
        let slot = InsightSlot::new("u-1", InsightKind::Weekly, march(3));
        db.record_insight_generation(&slot, "older", None, now())
            .unwrap();
        db.record_insight_generation(&slot, "newer", None, now() + chrono::Duration::hours(1))
            .unwrap();
        let morning = InsightSlot::new("u-1", InsightKind::Morning, march(3));
        db.record_insight_generation(&morning, "morning", None, now())
            .unwrap();

        let all = db.list_insights("u-1", None, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].text, "newer");

        let weekly = db
            .list_insights("u-1", Some(InsightKind::Weekly), 10)
            .unwrap();
        assert_eq!(weekly.len(), 2);

        assert_eq!(db.list_insights("u-1", None, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_writers_never_exceed_cap() {
        let db = Database::in_memory().unwrap();
        let slot = InsightSlot::new("u-1", InsightKind::Incident, march(5));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                let slot = slot.clone();
                std::thread::spawn(move || {
                    db.record_insight_generation(&slot, &format!("text {}", i), None, now())
                        .unwrap()
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| o.was_inserted())
            .count();

        assert_eq!(inserted, GENERATION_CAP as usize);
        assert_eq!(db.list_slot_generations(&slot).unwrap().len(), 3);
    }
}
