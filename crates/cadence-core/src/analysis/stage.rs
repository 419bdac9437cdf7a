//! Rule-based stage classification and streak tracking

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use super::aggregator::ActivityWindow;
use super::features::{extract_features, FeatureVector};
use super::STAGE_WINDOW_DAYS;
use crate::db::Database;
use crate::error::Result;
use crate::models::{Stage, UserStageRecord};

/// Map a 7-day feature vector to a stage
///
/// Rules are checked in order and the first match wins.
pub fn classify(features: &FeatureVector) -> Stage {
    if features.incident_rate > 0.5 && features.systemize_ratio < 0.2 {
        Stage::FireFighting
    } else if features.systemize_ratio > 0.4 && features.incident_rate < 0.3 {
        Stage::SystemBuilding
    } else if features.decision_rate > 2.0 && features.completion_rate > 0.8 {
        Stage::StrategicGrowth
    } else if features.quick_win_ratio > 0.5 {
        Stage::MomentumBuilding
    } else {
        Stage::Balanced
    }
}

/// Compute the next stage record from the previous one
///
/// Same stage on a later calendar day extends the streak by one. A repeat
/// evaluation on the same day leaves it as is. A different stage (or no
/// previous record) starts a new streak of 1 entered at `now`.
pub fn advance_stage_record(
    previous: Option<&UserStageRecord>,
    user_id: &str,
    stage: Stage,
    now: DateTime<Utc>,
) -> UserStageRecord {
    let today = now.date_naive();

    match previous {
        Some(prev) if prev.current_stage == stage => {
            let consecutive_days_in_stage = if today > prev.last_evaluated_on {
                prev.consecutive_days_in_stage.saturating_add(1)
            } else {
                prev.consecutive_days_in_stage
            };
            UserStageRecord {
                user_id: user_id.to_string(),
                current_stage: stage,
                entered_at: prev.entered_at,
                consecutive_days_in_stage,
                last_evaluated_on: prev.last_evaluated_on.max(today),
            }
        }
        _ => UserStageRecord {
            user_id: user_id.to_string(),
            current_stage: stage,
            entered_at: now,
            consecutive_days_in_stage: 1,
            last_evaluated_on: today,
        },
    }
}

/// Outcome of a fresh stage evaluation
#[derive(Debug, Clone, Serialize)]
pub struct StageEvaluation {
    pub stage: Stage,
    pub record: UserStageRecord,
    pub features: FeatureVector,
}

/// Classify the 7 days ending on `as_of` without writing anything
///
/// The returned record is what persisting this evaluation at `now` would
/// produce, given the currently stored record.
pub fn assess_stage(
    db: &Database,
    user_id: &str,
    as_of: NaiveDate,
    now: DateTime<Utc>,
) -> Result<StageEvaluation> {
    let window = ActivityWindow::load_ending(db, user_id, as_of, STAGE_WINDOW_DAYS)?;
    let features = extract_features(&window);
    let stage = classify(&features);
    let previous = db.get_user_stage(user_id)?;
    let record = advance_stage_record(previous.as_ref(), user_id, stage, now);

    Ok(StageEvaluation {
        stage,
        record,
        features,
    })
}

/// Classify the user's last 7 days and persist the result
pub fn evaluate_stage(db: &Database, user_id: &str, now: DateTime<Utc>) -> Result<StageEvaluation> {
    let assessed = assess_stage(db, user_id, now.date_naive(), now)?;
    let record = db.upsert_user_stage(user_id, assessed.stage, now)?;

    debug!(
        user_id,
        stage = assessed.stage.as_str(),
        streak = record.consecutive_days_in_stage,
        "Stage evaluated"
    );

    Ok(StageEvaluation { record, ..assessed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::extract_from_records;
    use crate::analysis::features::tests::task;
    use crate::models::{ActionKind, NewIncident, NewTask, Priority};
    use chrono::{NaiveDate, TimeZone};

    fn vector(f: impl FnOnce(&mut FeatureVector)) -> FeatureVector {
        let mut v = FeatureVector {
            window_days: 7,
            ..Default::default()
        };
        f(&mut v);
        v
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_each_rule() {
        assert_eq!(
            classify(&vector(|v| {
                v.incident_rate = 0.6;
                v.systemize_ratio = 0.1;
            })),
            Stage::FireFighting
        );
        assert_eq!(
            classify(&vector(|v| {
                v.systemize_ratio = 0.5;
                v.incident_rate = 0.1;
            })),
            Stage::SystemBuilding
        );
        assert_eq!(
            classify(&vector(|v| {
                v.decision_rate = 2.5;
                v.completion_rate = 0.9;
            })),
            Stage::StrategicGrowth
        );
        assert_eq!(
            classify(&vector(|v| v.quick_win_ratio = 0.6)),
            Stage::MomentumBuilding
        );
        assert_eq!(classify(&FeatureVector::default()), Stage::Balanced);
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        // Matches both the strategic and momentum rules
        let v = vector(|v| {
            v.decision_rate = 3.0;
            v.completion_rate = 0.9;
            v.quick_win_ratio = 0.9;
        });
        assert_eq!(classify(&v), Stage::StrategicGrowth);

        // High incidents with some systemizing falls through the first rule
        let v = vector(|v| {
            v.incident_rate = 0.6;
            v.systemize_ratio = 0.25;
        });
        assert_eq!(classify(&v), Stage::Balanced);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let v = vector(|v| {
            v.incident_rate = 0.5;
            v.systemize_ratio = 0.0;
        });
        assert_eq!(classify(&v), Stage::Balanced);

        let v = vector(|v| v.quick_win_ratio = 0.5);
        assert_eq!(classify(&v), Stage::Balanced);
    }

    #[test]
    fn test_five_tasks_without_systemizing_is_balanced() {
        let tasks = vec![
            task(Priority::High, ActionKind::Standard, true),
            task(Priority::High, ActionKind::Standard, true),
            task(Priority::Medium, ActionKind::Standard, true),
            task(Priority::Medium, ActionKind::Standard, true),
            task(Priority::Low, ActionKind::Standard, false),
        ];
        let v = extract_from_records(&tasks, &[], &[], &[], 7);
        assert_eq!(v.completion_rate, 0.8);
        assert_eq!(v.high_priority_ratio, 0.4);
        assert_eq!(classify(&v), Stage::Balanced);
    }

    #[test]
    fn test_five_tasks_mostly_systemizing_is_system_building() {
        let tasks = vec![
            task(Priority::High, ActionKind::Systemize, true),
            task(Priority::High, ActionKind::Systemize, true),
            task(Priority::Medium, ActionKind::Systemize, true),
            task(Priority::Medium, ActionKind::Standard, true),
            task(Priority::Low, ActionKind::Standard, false),
        ];
        let v = extract_from_records(&tasks, &[], &[], &[], 7);
        assert!(v.systemize_ratio > 0.4);
        assert_eq!(v.incident_rate, 0.0);
        assert_eq!(classify(&v), Stage::SystemBuilding);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let v = vector(|v| {
            v.quick_win_ratio = 0.7;
            v.completion_rate = 0.3;
        });
        let first = classify(&v);
        for _ in 0..10 {
            assert_eq!(classify(&v), first);
        }
    }

    #[test]
    fn test_advance_new_record() {
        let record = advance_stage_record(None, "u-1", Stage::Balanced, at(1));
        assert_eq!(record.consecutive_days_in_stage, 1);
        assert_eq!(record.entered_at, at(1));
        assert_eq!(
            record.last_evaluated_on,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_advance_increments_by_exactly_one() {
        let mut record = advance_stage_record(None, "u-1", Stage::Balanced, at(1));
        for day in 2..=5 {
            let next = advance_stage_record(Some(&record), "u-1", Stage::Balanced, at(day));
            assert_eq!(next.consecutive_days_in_stage, record.consecutive_days_in_stage + 1);
            assert_eq!(next.entered_at, at(1));
            record = next;
        }
        assert_eq!(record.consecutive_days_in_stage, 5);
    }

    #[test]
    fn test_advance_resets_on_change() {
        let first = advance_stage_record(None, "u-1", Stage::Balanced, at(1));
        let second = advance_stage_record(Some(&first), "u-1", Stage::Balanced, at(2));
        let changed = advance_stage_record(Some(&second), "u-1", Stage::FireFighting, at(3));
        assert_eq!(changed.consecutive_days_in_stage, 1);
        assert_eq!(changed.entered_at, at(3));
    }

    #[test]
    fn test_evaluate_stage_persists() {
        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();

        for d in 1..=5 {
            db.insert_incident(
                "u-1",
                &NewIncident {
                    date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    description: "fire".into(),
                    severity: None,
                },
            )
            .unwrap();
        }
        db.insert_task(
            "u-1",
            &NewTask {
                date: NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
                title: "triage".into(),
                priority: Priority::High,
                action: ActionKind::Standard,
                completed: false,
            },
        )
        .unwrap();

        let eval = evaluate_stage(&db, "u-1", at(7)).unwrap();
        assert_eq!(eval.features.incident_count, 5);
        assert_eq!(eval.stage, Stage::FireFighting);
        assert_eq!(eval.record.consecutive_days_in_stage, 1);

        let stored = db.get_user_stage("u-1").unwrap().unwrap();
        assert_eq!(stored.current_stage, Stage::FireFighting);
    }

    #[test]
    fn test_assess_stage_uses_window_and_writes_nothing() {
        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();

        // A rough first week of March, then a quiet week
        for d in 1..=5 {
            db.insert_incident(
                "u-1",
                &NewIncident {
                    date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
                    description: "fire".into(),
                    severity: None,
                },
            )
            .unwrap();
        }

        let past = assess_stage(&db, "u-1", NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(), at(20))
            .unwrap();
        assert_eq!(past.stage, Stage::FireFighting);
        assert_eq!(past.record.consecutive_days_in_stage, 1);

        let recent = assess_stage(&db, "u-1", NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(), at(20))
            .unwrap();
        assert_eq!(recent.stage, Stage::Balanced);

        assert!(db.get_user_stage("u-1").unwrap().is_none());
    }

    #[test]
    fn test_assess_stage_previews_streak() {
        let db = Database::in_memory().unwrap();
        db.upsert_user("u-1", None, true, true).unwrap();
        db.upsert_user_stage("u-1", Stage::Balanced, at(1)).unwrap();

        let assessed = assess_stage(&db, "u-1", NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), at(2))
            .unwrap();
        assert_eq!(assessed.stage, Stage::Balanced);
        assert_eq!(assessed.record.consecutive_days_in_stage, 2);

        // Stored record is untouched
        let stored = db.get_user_stage("u-1").unwrap().unwrap();
        assert_eq!(stored.consecutive_days_in_stage, 1);
    }
}
