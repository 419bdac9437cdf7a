//! Feature extraction
//!
//! Turns an [`ActivityWindow`] into a fixed-shape [`FeatureVector`]. Ratios
//! are `count / total` and rates are `count / window_days`; both are 0 when
//! the denominator is 0, so a vector never holds NaN or infinity.

use serde::Serialize;

use super::aggregator::ActivityWindow;
use crate::models::{ActionKind, Decision, Incident, PlannedTask, Priority, Review};

/// Upper bound of the focus score scale
const MAX_FOCUS_SCORE: f64 = 10.0;

/// Named numeric signals describing a user's behavior over a window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    /// Planned tasks per day
    pub task_volume_per_day: f64,
    pub completion_rate: f64,
    pub high_priority_ratio: f64,
    pub systemize_ratio: f64,
    pub quick_win_ratio: f64,
    /// Incidents per day
    pub incident_rate: f64,
    /// Decisions per day
    pub decision_rate: f64,
    pub proactive_decision_ratio: f64,
    /// Mean focus score of reviews that have one (0-10)
    pub avg_focus_score: f64,

    pub window_days: u32,
    pub task_count: u32,
    pub completed_count: u32,
    pub high_priority_count: u32,
    pub incident_count: u32,
    pub decision_count: u32,
    pub review_count: u32,
}

/// Identifies one numeric signal of a [`FeatureVector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    TaskVolume,
    Completion,
    HighPriority,
    Systemize,
    QuickWin,
    IncidentRate,
    DecisionRate,
    Proactive,
    Focus,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::TaskVolume => "task_volume_per_day",
            Feature::Completion => "completion_rate",
            Feature::HighPriority => "high_priority_ratio",
            Feature::Systemize => "systemize_ratio",
            Feature::QuickWin => "quick_win_ratio",
            Feature::IncidentRate => "incident_rate",
            Feature::DecisionRate => "decision_rate",
            Feature::Proactive => "proactive_decision_ratio",
            Feature::Focus => "avg_focus_score",
        }
    }

    pub fn all() -> &'static [Feature] {
        &[
            Feature::TaskVolume,
            Feature::Completion,
            Feature::HighPriority,
            Feature::Systemize,
            Feature::QuickWin,
            Feature::IncidentRate,
            Feature::DecisionRate,
            Feature::Proactive,
            Feature::Focus,
        ]
    }
}

impl FeatureVector {
    /// Value of a single signal
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::TaskVolume => self.task_volume_per_day,
            Feature::Completion => self.completion_rate,
            Feature::HighPriority => self.high_priority_ratio,
            Feature::Systemize => self.systemize_ratio,
            Feature::QuickWin => self.quick_win_ratio,
            Feature::IncidentRate => self.incident_rate,
            Feature::DecisionRate => self.decision_rate,
            Feature::Proactive => self.proactive_decision_ratio,
            Feature::Focus => self.avg_focus_score,
        }
    }

    fn set(&mut self, feature: Feature, value: f64) {
        match feature {
            Feature::TaskVolume => self.task_volume_per_day = value,
            Feature::Completion => self.completion_rate = value,
            Feature::HighPriority => self.high_priority_ratio = value,
            Feature::Systemize => self.systemize_ratio = value,
            Feature::QuickWin => self.quick_win_ratio = value,
            Feature::IncidentRate => self.incident_rate = value,
            Feature::DecisionRate => self.decision_rate = value,
            Feature::Proactive => self.proactive_decision_ratio = value,
            Feature::Focus => self.avg_focus_score = value,
        }
    }

    /// Completion rate as a whole percentage
    pub fn completion_percent(&self) -> u32 {
        (self.completion_rate * 100.0).round() as u32
    }

    /// True when the window held no activity at all
    pub fn is_empty(&self) -> bool {
        self.task_count == 0
            && self.decision_count == 0
            && self.incident_count == 0
            && self.review_count == 0
    }

    /// Element-wise mean of the numeric signals
    ///
    /// Counts are summed; the window length is taken from the first vector.
    /// Returns the zero vector for an empty input.
    pub fn mean<'a, I>(vectors: I) -> FeatureVector
    where
        I: IntoIterator<Item = &'a FeatureVector>,
    {
        let mut total = FeatureVector::default();
        let mut n = 0u32;

        for v in vectors {
            if n == 0 {
                total.window_days = v.window_days;
            }
            for &feature in Feature::all() {
                total.set(feature, total.get(feature) + v.get(feature));
            }
            total.task_count += v.task_count;
            total.completed_count += v.completed_count;
            total.high_priority_count += v.high_priority_count;
            total.incident_count += v.incident_count;
            total.decision_count += v.decision_count;
            total.review_count += v.review_count;
            n += 1;
        }

        if n > 0 {
            for &feature in Feature::all() {
                total.set(feature, total.get(feature) / n as f64);
            }
        }
        total
    }
}

/// Extract the feature vector for a loaded window
pub fn extract_features(window: &ActivityWindow) -> FeatureVector {
    extract_from_records(
        &window.tasks,
        &window.decisions,
        &window.reviews,
        &window.incidents,
        window.days(),
    )
}

/// Extract features from raw record slices and an explicit window length
pub fn extract_from_records(
    tasks: &[PlannedTask],
    decisions: &[Decision],
    reviews: &[Review],
    incidents: &[Incident],
    window_days: u32,
) -> FeatureVector {
    let task_count = tasks.len() as u32;
    let completed_count = tasks.iter().filter(|t| t.completed).count() as u32;
    let high_priority_count = tasks
        .iter()
        .filter(|t| t.priority == Priority::High)
        .count() as u32;
    let systemize_count = tasks
        .iter()
        .filter(|t| t.action == ActionKind::Systemize)
        .count() as u32;
    let quick_win_count = tasks
        .iter()
        .filter(|t| t.action == ActionKind::QuickWin)
        .count() as u32;

    let decision_count = decisions.len() as u32;
    let proactive_count = decisions.iter().filter(|d| d.proactive).count() as u32;
    let incident_count = incidents.len() as u32;

    let focus_scores: Vec<f64> = reviews
        .iter()
        .filter_map(|r| r.focus_score)
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, MAX_FOCUS_SCORE))
        .collect();
    let avg_focus_score = if focus_scores.is_empty() {
        0.0
    } else {
        focus_scores.iter().sum::<f64>() / focus_scores.len() as f64
    };

    FeatureVector {
        task_volume_per_day: rate(task_count, window_days),
        completion_rate: ratio(completed_count, task_count),
        high_priority_ratio: ratio(high_priority_count, task_count),
        systemize_ratio: ratio(systemize_count, task_count),
        quick_win_ratio: ratio(quick_win_count, task_count),
        incident_rate: rate(incident_count, window_days),
        decision_rate: rate(decision_count, window_days),
        proactive_decision_ratio: ratio(proactive_count, decision_count),
        avg_focus_score,
        window_days,
        task_count,
        completed_count,
        high_priority_count,
        incident_count,
        decision_count,
        review_count: reviews.len() as u32,
    }
}

fn ratio(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn rate(count: u32, days: u32) -> f64 {
    if days == 0 {
        0.0
    } else {
        count as f64 / days as f64
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::LegacyText;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    pub(crate) fn task(priority: Priority, action: ActionKind, completed: bool) -> PlannedTask {
        PlannedTask {
            id: 0,
            user_id: "u-1".into(),
            date: day(),
            title: "task".into(),
            priority,
            action,
            completed,
        }
    }

    fn review(focus: Option<f64>) -> Review {
        Review {
            id: 0,
            user_id: "u-1".into(),
            date: day(),
            mood: None,
            energy: None,
            focus_score: focus,
            wins: LegacyText::default(),
            lessons: LegacyText::default(),
        }
    }

    fn assert_bounded(v: &FeatureVector) {
        for f in [
            v.completion_rate,
            v.high_priority_ratio,
            v.systemize_ratio,
            v.quick_win_ratio,
            v.proactive_decision_ratio,
        ] {
            assert!(f.is_finite() && (0.0..=1.0).contains(&f), "ratio out of range: {}", f);
        }
        for r in [v.task_volume_per_day, v.incident_rate, v.decision_rate, v.avg_focus_score] {
            assert!(r.is_finite() && r >= 0.0, "rate out of range: {}", r);
        }
    }

    #[test]
    fn test_empty_window_is_all_zero() {
        let v = extract_from_records(&[], &[], &[], &[], 7);
        assert_eq!(v.completion_rate, 0.0);
        assert_eq!(v.task_volume_per_day, 0.0);
        assert!(v.is_empty());
        assert_bounded(&v);
    }

    #[test]
    fn test_zero_day_window_has_no_nan() {
        let tasks = vec![task(Priority::High, ActionKind::Standard, true)];
        let v = extract_from_records(&tasks, &[], &[], &[], 0);
        assert_eq!(v.task_volume_per_day, 0.0);
        assert_eq!(v.completion_rate, 1.0);
        assert_bounded(&v);
    }

    #[test]
    fn test_ratios_and_rates() {
        let tasks = vec![
            task(Priority::High, ActionKind::Systemize, true),
            task(Priority::High, ActionKind::QuickWin, true),
            task(Priority::Low, ActionKind::QuickWin, true),
            task(Priority::Medium, ActionKind::Standard, false),
        ];
        let decisions = vec![
            Decision {
                id: 0,
                user_id: "u-1".into(),
                date: day(),
                description: "hire".into(),
                proactive: true,
            },
            Decision {
                id: 0,
                user_id: "u-1".into(),
                date: day(),
                description: "refund".into(),
                proactive: false,
            },
        ];
        let reviews = vec![review(Some(6.0)), review(Some(8.0)), review(None)];

        let v = extract_from_records(&tasks, &decisions, &reviews, &[], 2);
        assert_eq!(v.task_volume_per_day, 2.0);
        assert_eq!(v.completion_rate, 0.75);
        assert_eq!(v.high_priority_ratio, 0.5);
        assert_eq!(v.systemize_ratio, 0.25);
        assert_eq!(v.quick_win_ratio, 0.5);
        assert_eq!(v.decision_rate, 1.0);
        assert_eq!(v.proactive_decision_ratio, 0.5);
        assert_eq!(v.avg_focus_score, 7.0);
        assert_eq!(v.review_count, 3);
        assert_eq!(v.completion_percent(), 75);
        assert_bounded(&v);
    }

    #[test]
    fn test_focus_scores_clamped() {
        let reviews = vec![review(Some(14.0)), review(Some(f64::NAN)), review(Some(-3.0))];
        let v = extract_from_records(&[], &[], &reviews, &[], 7);
        assert_eq!(v.avg_focus_score, 5.0);
    }

    #[test]
    fn test_mean_of_vectors() {
        let a = FeatureVector {
            completion_rate: 1.0,
            task_count: 4,
            window_days: 14,
            ..Default::default()
        };
        let b = FeatureVector {
            completion_rate: 0.5,
            task_count: 2,
            window_days: 14,
            ..Default::default()
        };
        let mean = FeatureVector::mean([&a, &b]);
        assert_eq!(mean.completion_rate, 0.75);
        assert_eq!(mean.task_count, 6);
        assert_eq!(mean.window_days, 14);

        assert_eq!(
            FeatureVector::mean(std::iter::empty::<&FeatureVector>()),
            FeatureVector::default()
        );
    }
}
