//! Deterministic fallback text
//!
//! Used whenever AI generation is unavailable or its output is rejected.
//! Every template returns non-empty text built only from numbers and fixed
//! phrasing, so it always passes the output guard. Free-text fields (wins,
//! goals, incident descriptions) are left to the AI path.

use super::types::{InsightContext, InsightKind};

/// Render the fallback for `ctx.kind`
pub fn render(ctx: &InsightContext) -> String {
    match ctx.kind {
        InsightKind::Morning => morning(ctx),
        InsightKind::PostPlan => post_plan(ctx),
        InsightKind::PostReflection => post_reflection(ctx),
        InsightKind::Weekly => look_back(ctx, "this week"),
        InsightKind::Monthly => look_back(ctx, "over the last month"),
        InsightKind::Incident => incident(ctx),
        InsightKind::ClusterPattern => cluster_pattern(ctx),
        InsightKind::AggregatePattern => aggregate_pattern(ctx),
        InsightKind::Profile => profile(ctx),
    }
}

fn plural(n: u32, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{} {}", n, one)
    } else {
        format!("{} {}", n, many)
    }
}

/// "You completed 80% of 5 planned tasks in the last 7 days."
fn follow_through(ctx: &InsightContext) -> String {
    let f = &ctx.features;
    if f.task_count == 0 {
        format!(
            "You have no planned tasks logged in the last {}.",
            plural(f.window_days, "day", "days")
        )
    } else {
        format!(
            "You completed {}% of {} in the last {}.",
            f.completion_percent(),
            plural(f.task_count, "planned task", "planned tasks"),
            plural(f.window_days, "day", "days")
        )
    }
}

fn morning(ctx: &InsightContext) -> String {
    let f = &ctx.features;
    let reframe = if f.task_count == 0 {
        "A short list is an easy place to start."
    } else if f.completion_rate >= 0.8 {
        "That is steady follow-through worth protecting."
    } else if f.completion_rate < 0.5 {
        "A smaller list often gets more done."
    } else {
        "Most of what you plan gets done."
    };
    format!(
        "{} {} Which single task would make today feel like a win?",
        follow_through(ctx),
        reframe
    )
}

fn post_plan(ctx: &InsightContext) -> String {
    let d = &ctx.day;
    if d.planned == 0 {
        return "No tasks are planned for today yet. Naming even 1 task makes it easier to begin. What is the first thing you want to finish?".to_string();
    }
    let reframe = if d.high_priority > 3 {
        "When many things are urgent, it helps to pick the one that truly is."
    } else {
        "A clear top priority makes the rest easier to sequence."
    };
    format!(
        "You planned {} for today, {} marked high priority. {} Which one will you start with?",
        plural(d.planned, "task", "tasks"),
        d.high_priority,
        reframe
    )
}

fn post_reflection(ctx: &InsightContext) -> String {
    let d = &ctx.day;
    if d.planned == 0 {
        return format!(
            "{} Reflecting on a day without a plan still shows where your time went. What would you like tomorrow to look like?",
            follow_through(ctx)
        );
    }
    let reframe = if d.completed >= d.planned {
        "Finishing everything you set out to do is worth noticing."
    } else if d.completed == 0 {
        "Some days go to work that never made the list."
    } else {
        "Partial days still move things forward."
    };
    format!(
        "You finished {} of {} planned tasks today. {} What would you keep doing tomorrow?",
        d.completed,
        d.planned,
        reframe
    )
}

fn look_back(ctx: &InsightContext, period: &str) -> String {
    let f = &ctx.features;
    let decisions = plural(f.decision_count, "decision", "decisions");
    let issues = plural(f.incident_count, "unplanned issue", "unplanned issues");
    if f.task_count == 0 {
        return format!(
            "You logged {} and {} {}, with no planned tasks. Planning even a few tasks makes the next look-back easier to read. What do you want to focus on next?",
            decisions, issues, period
        );
    }
    format!(
        "{} you completed {}% of {} and logged {} and {}. {} What pattern from this period do you want to keep?",
        capitalize(period),
        f.completion_percent(),
        plural(f.task_count, "planned task", "planned tasks"),
        decisions,
        issues,
        ctx.stage_sentence()
    )
}

fn incident(ctx: &InsightContext) -> String {
    let f = &ctx.features;
    format!(
        "That makes {} in the last {}. Problems like this are information, not failure. Which one could a simple routine have caught earlier?",
        plural(f.incident_count.max(1), "unplanned issue", "unplanned issues"),
        plural(f.window_days, "day", "days")
    )
}

fn cluster_pattern(ctx: &InsightContext) -> String {
    let f = &ctx.features;
    match &ctx.group {
        Some(group) => format!(
            "You work a lot like {} whose shared habit is {}. You completed {}% of your planned tasks over the last {}. Which part of that habit fits you best?",
            group.size_label,
            group.descriptions.join(" and "),
            f.completion_percent(),
            plural(f.window_days, "day", "days")
        ),
        None => format!(
            "{} Your way of working is your own right now. What is one habit you want to build on?",
            follow_through(ctx)
        ),
    }
}

fn aggregate_pattern(ctx: &InsightContext) -> String {
    let f = &ctx.features;
    match &ctx.group {
        Some(group) => format!(
            "Across {} in a similar situation, a common thread is {}. You completed {}% of your planned tasks over the last {}. What would you borrow from them?",
            group.size_label,
            group.descriptions.join(" and "),
            f.completion_percent(),
            plural(f.window_days, "day", "days")
        ),
        None => format!(
            "{} Every founder's month looks different. What is working for you right now?",
            follow_through(ctx)
        ),
    }
}

fn profile(ctx: &InsightContext) -> String {
    let f = &ctx.features;
    format!(
        "{} You logged {} and {}. {} What would you like to be true a month from now?",
        follow_through(ctx),
        plural(f.decision_count, "decision", "decisions"),
        plural(f.incident_count, "unplanned issue", "unplanned issues"),
        ctx.stage_sentence()
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl InsightContext {
    /// "You have been in a steady mix of planned work and reflection for 3 days."
    fn stage_sentence(&self) -> String {
        format!(
            "You have been in {} for {}.",
            self.stage.plain_description(),
            plural(self.days_in_stage.max(1), "day", "days")
        )
    }
}
