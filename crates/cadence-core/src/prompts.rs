//! Prompt library for insight generation
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/cadence/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! This allows users to customize prompts without modifying the source,
//! while automatically getting new default prompts on upgrade.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::insights::InsightKind;

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const MORNING: &str = include_str!("../../../prompts/morning.md");
    pub const POST_PLAN: &str = include_str!("../../../prompts/post_plan.md");
    pub const POST_REFLECTION: &str = include_str!("../../../prompts/post_reflection.md");
    pub const WEEKLY: &str = include_str!("../../../prompts/weekly.md");
    pub const MONTHLY: &str = include_str!("../../../prompts/monthly.md");
    pub const INCIDENT: &str = include_str!("../../../prompts/incident.md");
    pub const CLUSTER_PATTERN: &str = include_str!("../../../prompts/cluster_pattern.md");
    pub const AGGREGATE_PATTERN: &str = include_str!("../../../prompts/aggregate_pattern.md");
    pub const PROFILE: &str = include_str!("../../../prompts/profile.md");
}

fn default_content(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Morning => defaults::MORNING,
        InsightKind::PostPlan => defaults::POST_PLAN,
        InsightKind::PostReflection => defaults::POST_REFLECTION,
        InsightKind::Weekly => defaults::WEEKLY,
        InsightKind::Monthly => defaults::MONTHLY,
        InsightKind::Incident => defaults::INCIDENT,
        InsightKind::ClusterPattern => defaults::CLUSTER_PATTERN,
        InsightKind::AggregatePattern => defaults::AGGREGATE_PATTERN,
        InsightKind::Profile => defaults::PROFILE,
    }
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Matches the insight kind (`morning`, `weekly`, ...)
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Word ceiling enforced on the generated text
    pub max_words: usize,
    /// Completion token limit sent to the provider
    pub max_tokens: u32,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Metadata from frontmatter
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    /// Path to override file (if any)
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the whole prompt with template variables replaced
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render just the system section with variables
    pub fn render_system(&self, vars: &HashMap<&str, &str>) -> String {
        self.system_section()
            .map(|s| render_template(s, vars))
            .unwrap_or_default()
    }

    /// Render just the user section with variables
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }
}

/// Prompt library for loading and caching prompts
pub struct PromptLibrary {
    /// Override directory path
    override_dir: Option<PathBuf>,
    /// Cached parsed prompts
    cache: HashMap<InsightKind, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get the prompt for an insight kind, loading from override or default
    pub fn get(&mut self, kind: InsightKind) -> Result<&Prompt> {
        if !self.cache.contains_key(&kind) {
            let prompt = self.load(kind)?;
            self.cache.insert(kind, prompt);
        }
        self.cache
            .get(&kind)
            .ok_or_else(|| Error::NotFound(format!("prompt {}", kind)))
    }

    /// Load a prompt (checking override first, then default)
    fn load(&self, kind: InsightKind) -> Result<Prompt> {
        if let Some(override_path) = self.override_path(kind) {
            if override_path.exists() {
                let content = fs::read_to_string(&override_path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                let (metadata, body) = parse_prompt(&content)?;
                return Ok(Prompt {
                    metadata,
                    content: body,
                    is_override: true,
                    override_path: Some(override_path),
                });
            }
        }

        let (metadata, body) = parse_prompt(default_content(kind))?;
        Ok(Prompt {
            metadata,
            content: body,
            is_override: false,
            override_path: None,
        })
    }

    /// List all prompts with their override status
    pub fn list(&mut self) -> Vec<PromptInfo> {
        InsightKind::all()
            .iter()
            .map(|&kind| {
                let has_override = self.has_override(kind);
                let override_path = if has_override {
                    self.override_path(kind)
                } else {
                    None
                };
                let prompt = self.get(kind).ok();
                PromptInfo {
                    kind,
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    max_words: prompt.map(|p| p.metadata.max_words).unwrap_or(0),
                    max_tokens: prompt.map(|p| p.metadata.max_tokens).unwrap_or(0),
                    has_override,
                    override_path,
                }
            })
            .collect()
    }

    /// Check if a prompt has an override file
    pub fn has_override(&self, kind: InsightKind) -> bool {
        self.override_path(kind).is_some_and(|p| p.exists())
    }

    fn override_path(&self, kind: InsightKind) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|d| d.join(format!("{}.md", kind.as_str())))
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Clear the cache (useful after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub kind: InsightKind,
    /// Version from metadata
    pub version: u32,
    pub max_words: usize,
    pub max_tokens: u32,
    /// Whether an override exists
    pub has_override: bool,
    /// Path to override file (if exists)
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("cadence").join("prompts").join("overrides"))
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    // Check for YAML frontmatter
    let Some(rest) = content.strip_prefix("---") else {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    };

    // Find end of frontmatter
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = rest[..end].trim();
    let body = rest[end + 3..].trim();

    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Find the next header or end of content
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    // Conditionals first, so `{{#if var}}` markers are not mangled by substitution
    let mut result = remove_unmatched_conditionals(template, vars);

    // Simple mustache-style replacement: {{var}}
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }

    result
}

/// Resolve `{{#if var}}...{{/if}}` blocks against the provided variables
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    loop {
        let Some(if_start) = result.find("{{#if ") else {
            break;
        };
        let var_start = if_start + 6;
        let Some(var_end) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_end].trim().to_string();
        let block_start = var_start + var_end + 2;

        let Some(endif_pos) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let full_end = block_start + endif_pos + 7;

        // Keep the block only when the variable is present and non-empty
        let should_include = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());

        result = if should_include {
            format!(
                "{}{}{}",
                &result[..if_start],
                &result[block_start..block_start + endif_pos],
                &result[full_end..]
            )
        } else {
            format!("{}{}", &result[..if_start], &result[full_end..])
        };
    }

    result
}
