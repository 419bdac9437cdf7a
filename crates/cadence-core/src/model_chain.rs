//! Model fallback chain configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/cadence/config/models.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! `CADENCE_AI_MODEL` then replaces the preferred model.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/models.toml");

/// Environment variable that overrides the preferred model
pub const MODEL_ENV: &str = "CADENCE_AI_MODEL";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A model tried after the preferred one, with the reason it is in the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackModel {
    pub model: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Resolved model chain settings
#[derive(Debug, Clone)]
pub struct ModelChainConfig {
    pub preferred_model: String,
    /// Per-request timeout; expiry counts as a hard failure for that model
    pub timeout: Duration,
    pub temperature: f32,
    pub fallbacks: Vec<FallbackModel>,
    /// Override file the config came from, if any
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    defaults: Option<RawDefaults>,
    #[serde(default)]
    fallback: Vec<FallbackModel>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    preferred_model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
}

impl ModelChainConfig {
    /// Load from the override path (or embedded defaults) and apply the env override
    pub fn load() -> Result<Self> {
        let config = match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            _ => Self::embedded()?,
        };
        Ok(config.with_env_override())
    }

    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Load a specific config file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config = Self::parse(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid model config TOML: {}", e)))?;

        let defaults = raw.defaults.ok_or_else(|| {
            Error::Config("Model config is missing the [defaults] table".into())
        })?;
        let preferred_model = defaults
            .preferred_model
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| Error::Config("defaults.preferred_model is required".into()))?;

        Ok(Self {
            preferred_model,
            timeout: Duration::from_secs(defaults.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            temperature: defaults.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            fallbacks: raw.fallback,
            source: None,
        })
    }

    /// Replace the preferred model with `CADENCE_AI_MODEL` when set
    pub fn with_env_override(self) -> Self {
        match std::env::var(MODEL_ENV) {
            Ok(model) if !model.trim().is_empty() => self.with_preferred_model(model.trim()),
            _ => self,
        }
    }

    pub fn with_preferred_model(mut self, model: &str) -> Self {
        self.preferred_model = model.to_string();
        self
    }

    /// Ordered, de-duplicated list of models to try
    pub fn chain(&self) -> Vec<String> {
        build_chain(
            &self.preferred_model,
            self.fallbacks.iter().map(|f| f.model.as_str()),
        )
    }

    /// Note attached to a fallback model
    pub fn note_for(&self, model: &str) -> Option<&str> {
        self.fallbacks
            .iter()
            .find(|f| f.model == model)
            .and_then(|f| f.note.as_deref())
    }
}

/// Preferred model first, then fallbacks, skipping blanks and repeats
pub fn build_chain<'a>(preferred: &'a str, fallbacks: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut chain: Vec<String> = Vec::new();
    for model in std::iter::once(preferred).chain(fallbacks) {
        let model = model.trim();
        if model.is_empty() || chain.iter().any(|m| m == model) {
            continue;
        }
        chain.push(model.to_string());
    }
    chain
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("cadence").join("config").join("models.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let config = ModelChainConfig::embedded().unwrap();
        assert!(!config.preferred_model.is_empty());
        assert!(!config.fallbacks.is_empty());
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.fallbacks.iter().all(|f| f.note.is_some()));
    }

    #[test]
    fn test_chain_has_no_duplicates() {
        let config = ModelChainConfig::parse(
            r#"
            [defaults]
            preferred_model = "b"

            [[fallback]]
            model = "a"

            [[fallback]]
            model = "b"
            note = "listed twice"

            [[fallback]]
            model = "c"

            [[fallback]]
            model = "a"
            "#,
        )
        .unwrap();

        assert_eq!(config.chain(), vec!["b", "a", "c"]);
        assert_eq!(config.note_for("b"), Some("listed twice"));
    }

    #[test]
    fn test_preferred_override_moves_to_front() {
        let config = ModelChainConfig::embedded()
            .unwrap()
            .with_preferred_model("openai/gpt-4o-mini");
        let chain = config.chain();
        assert_eq!(chain[0], "openai/gpt-4o-mini");
        assert_eq!(
            chain.iter().filter(|m| *m == "openai/gpt-4o-mini").count(),
            1
        );
    }

    #[test]
    fn test_missing_defaults_is_error() {
        assert!(ModelChainConfig::parse("[[fallback]]\nmodel = \"x\"\n").is_err());
        assert!(ModelChainConfig::parse("[defaults]\npreferred_model = \"  \"\n").is_err());
        assert!(ModelChainConfig::parse("not toml [").is_err());
    }

    #[test]
    fn test_build_chain_skips_blanks() {
        assert_eq!(build_chain("a", ["", " a ", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn test_from_path_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.toml");
        fs::write(&path, "[defaults]\npreferred_model = \"local\"\ntimeout_secs = 5\n").unwrap();

        let config = ModelChainConfig::from_path(&path).unwrap();
        assert_eq!(config.preferred_model, "local");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.fallbacks.is_empty());
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }
}
