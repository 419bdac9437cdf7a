//! Insight text generation
//!
//! Primary path: render the kind's prompt, walk the model chain, then run
//! the output through the guard. Anything short of accepted text (no AI
//! configured, every model failed, banned vocabulary) falls back to the
//! deterministic template for the kind. Generation has no persistence side
//! effects; storing the result is the caller's business.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::ai::{AIOrchestrator, TextRequest};
use crate::error::Result;
use crate::prompts::PromptLibrary;

use super::guard::{GuardVerdict, OutputGuard, BANNED_TERMS};
use super::templates;
use super::types::{GeneratedInsight, GenerationSource, InsightContext};

/// Prompt plus the limits that come with it
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    pub request: TextRequest,
    pub max_words: usize,
}

/// Produces insight text from an [`InsightContext`]
#[derive(Clone)]
pub struct InsightGenerator {
    orchestrator: Option<AIOrchestrator>,
    prompts: Arc<Mutex<PromptLibrary>>,
    guard: OutputGuard,
}

impl InsightGenerator {
    pub fn new(orchestrator: Option<AIOrchestrator>, prompts: PromptLibrary) -> Result<Self> {
        Ok(Self {
            orchestrator,
            prompts: Arc::new(Mutex::new(prompts)),
            guard: OutputGuard::new()?,
        })
    }

    /// Generator that never calls a provider
    pub fn template_only() -> Result<Self> {
        Self::new(None, PromptLibrary::embedded_only())
    }

    pub fn has_ai(&self) -> bool {
        self.orchestrator.is_some()
    }

    pub fn orchestrator(&self) -> Option<&AIOrchestrator> {
        self.orchestrator.as_ref()
    }

    /// Generate text for `ctx`; always returns something usable
    pub async fn generate(&self, ctx: &InsightContext) -> GeneratedInsight {
        if let Some(insight) = self.generate_with_ai(ctx).await {
            return insight;
        }
        debug!(kind = %ctx.kind, "Using template text");
        GeneratedInsight {
            text: templates::render(ctx),
            source: GenerationSource::Template,
        }
    }

    /// AI path only; `None` when it could not produce acceptable text
    pub async fn generate_with_ai(&self, ctx: &InsightContext) -> Option<GeneratedInsight> {
        let orchestrator = self.orchestrator.as_ref()?;

        let prepared = match self.prepare(ctx) {
            Ok(p) => p,
            Err(e) => {
                warn!(kind = %ctx.kind, error = %e, "Failed to render prompt");
                return None;
            }
        };

        let result = orchestrator.generate_traced(&prepared.request).await;
        let text = result.text?;
        let model = result.model.unwrap_or_default();

        match self.guard.check(&text, prepared.max_words) {
            GuardVerdict::Accepted { text, truncated } => {
                if truncated {
                    debug!(kind = %ctx.kind, model = %model, max_words = prepared.max_words, "Truncated generated text");
                }
                Some(GeneratedInsight {
                    text,
                    source: GenerationSource::Ai { model },
                })
            }
            GuardVerdict::Banned { term } => {
                warn!(kind = %ctx.kind, model = %model, term = %term, "Generated text used internal vocabulary, discarding");
                None
            }
            GuardVerdict::Overlong { words } => {
                warn!(kind = %ctx.kind, model = %model, words, max_words = prepared.max_words, "Closing question exceeds word ceiling, discarding");
                None
            }
            GuardVerdict::Empty => None,
        }
    }

    /// Render the prompt for `ctx` without sending it
    pub fn prepare(&self, ctx: &InsightContext) -> Result<PreparedPrompt> {
        let mut prompts = self.prompts.lock().unwrap_or_else(PoisonError::into_inner);
        let prompt = prompts.get(ctx.kind)?;
        let max_words = prompt.metadata.max_words;

        let values = prompt_values(ctx, max_words);
        let vars: HashMap<&str, &str> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();

        Ok(PreparedPrompt {
            request: TextRequest::new(
                prompt.render_system(&vars),
                prompt.render_user(&vars),
                prompt.metadata.max_tokens,
            ),
            max_words,
        })
    }
}

/// Writing rules shared by every prompt
pub fn style_rules(max_words: usize) -> String {
    format!(
        "Rules:\n\
         - First state one specific fact from the numbers given, then reframe what it might mean, then ask exactly one open question.\n\
         - At most {} words. Plain sentences only: no lists, headings, greetings or sign-offs.\n\
         - Speak to the reader as \"you\". Never mention other people by name.\n\
         - Never use any of these words or close variants: {}.",
        max_words,
        BANNED_TERMS.join(", ")
    )
}

fn percent(ratio: f64) -> String {
    format!("{}", (ratio * 100.0).round() as u32)
}

fn prompt_values(ctx: &InsightContext, max_words: usize) -> Vec<(&'static str, String)> {
    let f = &ctx.features;
    let d = &ctx.day;
    let p = &ctx.profile;
    let optional = |v: Option<u8>| v.map(|n| n.to_string()).unwrap_or_default();

    vec![
        (
            "name",
            ctx.display_name
                .clone()
                .unwrap_or_else(|| "this founder".to_string()),
        ),
        ("date", ctx.target_date.format("%A, %B %-d").to_string()),
        ("window_days", f.window_days.to_string()),
        ("task_count", f.task_count.to_string()),
        ("completed_count", f.completed_count.to_string()),
        ("completion_percent", f.completion_percent().to_string()),
        ("high_priority_count", f.high_priority_count.to_string()),
        ("decision_count", f.decision_count.to_string()),
        ("proactive_percent", percent(f.proactive_decision_ratio)),
        ("incident_count", f.incident_count.to_string()),
        ("review_count", f.review_count.to_string()),
        (
            "avg_focus",
            if f.avg_focus_score > 0.0 {
                format!("{:.1}", f.avg_focus_score)
            } else {
                String::new()
            },
        ),
        ("situation", ctx.stage.plain_description().to_string()),
        ("days_in_situation", ctx.days_in_stage.max(1).to_string()),
        ("today_planned", d.planned.to_string()),
        ("today_completed", d.completed.to_string()),
        ("today_high_priority", d.high_priority.to_string()),
        ("wins", d.wins.join("; ")),
        ("lessons", d.lessons.join("; ")),
        ("incidents", d.incidents.join("; ")),
        ("mood", optional(d.mood)),
        ("energy", optional(d.energy)),
        ("goals", p.goals.joined("; ")),
        ("struggles", p.struggles.joined("; ")),
        ("hobbies", p.hobbies.joined("; ")),
        (
            "group_size",
            ctx.group
                .as_ref()
                .map(|g| g.size_label.clone())
                .unwrap_or_default(),
        ),
        (
            "group_pattern",
            ctx.group
                .as_ref()
                .map(|g| g.descriptions.join("; "))
                .unwrap_or_default(),
        ),
        ("max_words", max_words.to_string()),
        ("style_rules", style_rules(max_words)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockBackend, MockReply};
    use crate::insights::guard::word_count;
    use crate::insights::templates::tests::context;
    use crate::insights::InsightKind;
    use crate::model_chain::{FallbackModel, ModelChainConfig};
    use crate::models::LegacyText;
    use std::time::Duration;

    fn chain() -> ModelChainConfig {
        ModelChainConfig {
            preferred_model: "primary".to_string(),
            timeout: Duration::from_secs(5),
            temperature: 0.7,
            fallbacks: ["backup-1", "backup-2"]
                .iter()
                .map(|m| FallbackModel {
                    model: m.to_string(),
                    note: None,
                })
                .collect(),
            source: None,
        }
    }

    fn generator(mock: &MockBackend) -> InsightGenerator {
        let orchestrator = AIOrchestrator::new(mock.clone().into(), chain());
        InsightGenerator::new(Some(orchestrator), PromptLibrary::embedded_only()).unwrap()
    }

    #[tokio::test]
    async fn test_ai_text_is_used_when_clean() {
        let mock = MockBackend::new().with_reply(
            "primary",
            MockReply::Text("You closed 4 of 5 tasks. That is a rhythm. What keeps it going?".into()),
        );
        let insight = generator(&mock).generate(&context(InsightKind::Morning)).await;

        assert_eq!(
            insight.source,
            GenerationSource::Ai {
                model: "primary".into()
            }
        );
        assert!(insight.text.starts_with("You closed 4 of 5 tasks."));
    }

    #[tokio::test]
    async fn test_all_models_blocked_falls_back_to_template() {
        let mock = MockBackend::all_region_blocked();
        let insight = generator(&mock).generate(&context(InsightKind::Morning)).await;

        assert_eq!(insight.source, GenerationSource::Template);
        assert!(insight.text.contains("80%"), "{}", insight.text);
        assert_eq!(mock.called_models(), vec!["primary", "backup-1", "backup-2"]);
    }

    #[tokio::test]
    async fn test_banned_vocabulary_discarded() {
        let mock = MockBackend::new().with_default_reply(MockReply::Text(
            "Your system_building stage is going well. Keep going?".into(),
        ));
        let ctx = context(InsightKind::Weekly);
        let insight = generator(&mock).generate(&ctx).await;

        assert_eq!(insight.source, GenerationSource::Template);
        assert_eq!(insight.text, templates::render(&ctx));
    }

    #[tokio::test]
    async fn test_long_output_truncated_to_ceiling() {
        let sentence = "You kept a steady pace on the work you chose this week. ";
        let question = "What will you protect tomorrow?";
        let reply = format!("{}{}", sentence.repeat(10), question);
        let mock = MockBackend::new().with_default_reply(MockReply::Text(reply));
        let insight = generator(&mock).generate(&context(InsightKind::Morning)).await;

        assert!(matches!(insight.source, GenerationSource::Ai { .. }));
        assert!(word_count(&insight.text) <= 60);
        assert!(insight.text.starts_with(sentence.trim()));
        assert!(insight.text.ends_with(question));
    }

    #[tokio::test]
    async fn test_oversized_question_falls_back_to_template() {
        let question = format!("{}?", "and what else ".repeat(25).trim());
        let mock = MockBackend::new().with_default_reply(MockReply::Text(question));
        let insight = generator(&mock).generate(&context(InsightKind::Morning)).await;

        assert_eq!(insight.source, GenerationSource::Template);
    }

    #[tokio::test]
    async fn test_template_only_never_calls_provider() {
        let generator = InsightGenerator::template_only().unwrap();
        assert!(!generator.has_ai());
        let ctx = context(InsightKind::PostReflection);
        let insight = generator.generate(&ctx).await;
        assert_eq!(insight.source, GenerationSource::Template);
        assert!(insight.text.contains("3 of 4"));
    }

    #[test]
    fn test_prepared_prompt_carries_limits_and_context() {
        let mut ctx = context(InsightKind::Morning);
        ctx.display_name = Some("Ada".into());
        ctx.profile.goals = LegacyText::List(vec!["ship v2".into(), "hire".into()]);

        let generator = InsightGenerator::template_only().unwrap();
        let prepared = generator.prepare(&ctx).unwrap();

        assert_eq!(prepared.max_words, 60);
        assert_eq!(prepared.request.max_tokens, 120);
        assert!(prepared.request.user.contains("Ada"));
        assert!(prepared.request.user.contains("80%"));
        assert!(prepared.request.user.contains("ship v2; hire"));
        assert!(!prepared.request.user.contains("{{"));
        assert!(prepared.request.system.contains("system_building"));
        assert!(prepared.request.system.contains("At most 60 words"));
    }

    #[test]
    fn test_prepared_prompt_drops_empty_sections() {
        let generator = InsightGenerator::template_only().unwrap();
        let prepared = generator.prepare(&context(InsightKind::Monthly)).unwrap();
        assert!(!prepared.request.user.contains("Their goals"));
        assert!(!prepared.request.user.contains("Outside work"));
        assert!(!prepared.request.user.contains("{{"));
    }
}
