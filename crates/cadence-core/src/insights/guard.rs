//! Output guard for generated text
//!
//! Provider output is only shown to a user after it passes two checks:
//! no internal vocabulary (stage codes, analysis jargon) and no more words
//! than the prompt's ceiling. Banned terms reject the text outright; the
//! caller falls back to a template. Over-long text is cut back to whole
//! sentences where possible, always keeping a closing question.

use regex::Regex;

use crate::error::Result;

/// Internal terms that must never reach a user
pub const BANNED_TERMS: &[&str] = &[
    "stage",
    "cluster",
    "cohort",
    "segment",
    "fire_fighting",
    "fire fighting",
    "system_building",
    "system building",
    "strategic_growth",
    "strategic growth",
    "momentum_building",
    "momentum building",
    "feature vector",
    "completion rate",
    "incident rate",
    "systemize ratio",
    "quick win ratio",
    "ratio",
    "algorithm",
    "classification",
    "classified",
    "data point",
    "metric",
    "language model",
    "as an ai",
];

/// Result of checking one piece of generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Text is safe to show, possibly shortened
    Accepted { text: String, truncated: bool },
    /// Text leaked a banned term
    Banned { term: String },
    /// Nothing left after trimming
    Empty,
    /// Closing question alone is longer than the ceiling
    Overlong { words: usize },
}

/// Banned-vocabulary and word-ceiling check
#[derive(Debug, Clone)]
pub struct OutputGuard {
    banned: Regex,
}

impl OutputGuard {
    pub fn new() -> Result<Self> {
        Self::with_terms(BANNED_TERMS)
    }

    /// Guard against a custom term list (matched case-insensitively, plurals included)
    pub fn with_terms(terms: &[&str]) -> Result<Self> {
        let alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let banned = Regex::new(&format!(r"(?i)\b(?:{})s?\b", alternation))?;
        Ok(Self { banned })
    }

    /// First banned term found in `text`, lowercased
    pub fn find_banned(&self, text: &str) -> Option<String> {
        self.banned.find(text).map(|m| m.as_str().to_lowercase())
    }

    pub fn check(&self, text: &str, max_words: usize) -> GuardVerdict {
        let text = text.trim();
        if text.is_empty() {
            return GuardVerdict::Empty;
        }
        if let Some(term) = self.find_banned(text) {
            return GuardVerdict::Banned { term };
        }

        if word_count(text) <= max_words {
            return GuardVerdict::Accepted {
                text: text.to_string(),
                truncated: false,
            };
        }

        if let Some(question) = closing_question(text) {
            let words = word_count(question);
            if words > max_words {
                return GuardVerdict::Overlong { words };
            }
        }

        GuardVerdict::Accepted {
            text: truncate_to_words(text, max_words),
            truncated: true,
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Shorten `text` to at most `max_words` words
///
/// Keeps leading whole sentences when at least one fits; otherwise cuts
/// mid-sentence and ends with an ellipsis. A closing question that fits
/// the ceiling is always kept, with middle sentences dropped to make room.
pub fn truncate_to_words(text: &str, max_words: usize) -> String {
    if word_count(text) <= max_words {
        return text.trim().to_string();
    }

    let all = sentences(text);
    let (body, closing) = match all.split_last() {
        Some((last, rest)) if last.ends_with('?') && word_count(last) <= max_words => {
            (rest, Some(*last))
        }
        _ => (&all[..], None),
    };
    let budget = max_words - closing.map_or(0, word_count);

    let mut kept = Vec::new();
    let mut used = 0;
    for sentence in body {
        let words = word_count(sentence);
        if used + words > budget {
            break;
        }
        used += words;
        kept.push(*sentence);
    }
    if let Some(question) = closing {
        kept.push(question);
    }
    if !kept.is_empty() {
        return kept.join(" ");
    }

    let cut = text
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}...", cut.trim_end_matches([',', ';', ':', '.', '-']))
}

/// Final sentence of `text` when it is a question
fn closing_question(text: &str) -> Option<&str> {
    sentences(text).pop().filter(|s| s.ends_with('?'))
}

/// Split on `.`, `!` or `?` followed by whitespace or the end of text
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if at_boundary {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> OutputGuard {
        OutputGuard::new().unwrap()
    }

    #[test]
    fn test_accepts_plain_coaching_text() {
        let text = "You finished 4 of 5 tasks. That is steady work. What made the difference?";
        assert_eq!(
            guard().check(text, 60),
            GuardVerdict::Accepted {
                text: text.to_string(),
                truncated: false
            }
        );
    }

    #[test]
    fn test_rejects_stage_codes_and_jargon() {
        let g = guard();
        for text in [
            "You are in the system_building phase.",
            "Your current Stage suggests focus.",
            "People in your cluster do this.",
            "Your completion rate is 80%.",
            "Founders in Fire Fighting mode should rest.",
            "As an AI, I think you did well.",
            "Several clusters share this habit.",
        ] {
            assert!(
                matches!(g.check(text, 60), GuardVerdict::Banned { .. }),
                "should reject: {}",
                text
            );
        }
    }

    #[test]
    fn test_word_boundaries() {
        let g = guard();
        // Substrings of ordinary words are fine
        assert!(g.find_banned("The staged rollout went well on backstage day.").is_none());
        assert!(g.find_banned("Metrics").is_some());
        assert_eq!(g.find_banned("a STAGE"), Some("stage".to_string()));
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(guard().check("   \n ", 60), GuardVerdict::Empty);
    }

    #[test]
    fn test_truncates_to_whole_sentences() {
        let text = "One two three. Four five six. Seven eight nine ten.";
        assert_eq!(truncate_to_words(text, 7), "One two three. Four five six.");

        match guard().check(text, 7) {
            GuardVerdict::Accepted { text, truncated } => {
                assert!(truncated);
                assert!(word_count(&text) <= 7);
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn test_truncation_keeps_closing_question() {
        let text = "One two three. Four five six. Seven eight nine ten?";
        assert_eq!(truncate_to_words(text, 7), "One two three. Seven eight nine ten?");
        // Only the question fits
        assert_eq!(truncate_to_words(text, 5), "Seven eight nine ten?");

        match guard().check(text, 7) {
            GuardVerdict::Accepted { text, truncated } => {
                assert!(truncated);
                assert!(text.ends_with('?'));
                assert!(word_count(&text) <= 7);
            }
            other => panic!("unexpected verdict: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_question_longer_than_ceiling() {
        let text = "Good week. What is one thing you would protect next week?";
        assert_eq!(guard().check(text, 5), GuardVerdict::Overlong { words: 10 });
    }

    #[test]
    fn test_truncates_mid_sentence_when_nothing_fits() {
        let text = "This first sentence is much longer than the allowed ceiling, sadly.";
        let cut = truncate_to_words(text, 5);
        assert_eq!(cut, "This first sentence is much...");
        assert_eq!(word_count(&cut), 5);
    }

    #[test]
    fn test_decimal_points_are_not_sentence_ends() {
        assert_eq!(sentences("Focus averaged 7.5 today. Nice."), vec![
            "Focus averaged 7.5 today.",
            "Nice."
        ]);
    }
}
