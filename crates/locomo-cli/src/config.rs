//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$LOCOMO_CONFIG` environment variable
//! 2. `~/.config/locomo-bench/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use locomo_core::{BenchError, BenchResult};
use locomo_metrics::Pricing;
use locomo_score::SingleHopMode;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub memory: MemoryConfig,
    pub llm: LlmConfig,
    pub pricing: Pricing,
    pub scoring: ScoringConfig,
    pub retry: RetryConfig,
    pub run: RunConfig,
}

/// Memory store REST API.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub url: String,
    pub top_k: usize,
    /// Similarity floor for free-response retrieval.
    pub min_similarity: f64,
    /// Similarity floor for multiple-choice retrieval.
    pub choice_min_similarity: f64,
    pub timeout_secs: u64,
    pub domain: String,
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub choice_max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub single_hop: SingleHopMode,
    pub low_score_threshold: f64,
}

/// Bounded retry around collaborator calls.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// First backoff; doubled after every failed attempt.
    pub backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Delete a conversation's memories when moving past it.
    pub clear_sessions: bool,
    /// Threads used by `rescore`.
    pub workers: usize,
}

// --- Defaults ---

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3099/api/v1".into(),
            top_k: 10,
            min_similarity: 0.0,
            choice_min_similarity: 0.3,
            timeout_secs: 30,
            domain: "locomo-benchmark".into(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".into(),
            model: "deepseek-chat".into(),
            api_key_env: "DEEPSEEK_API_KEY".into(),
            temperature: 0.0,
            max_tokens: 100,
            choice_max_tokens: 20,
            timeout_secs: 30,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            single_hop: SingleHopMode::Plain,
            low_score_threshold: 0.5,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 250,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            clear_sessions: true,
            workers: 4,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> BenchResult<String> {
        let key = std::env::var(&self.api_key_env).unwrap_or_default();
        let key = key.trim();
        if key.is_empty() {
            return Err(BenchError::Config(format!("{} is not set", self.api_key_env)));
        }
        Ok(key.to_string())
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(p) if p.exists() => load_config_from(&p),
        _ => Ok(Config::default()),
    }
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("LOCOMO_CONFIG") {
        return Some(PathBuf::from(p));
    }

    directories::BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(".config")
            .join("locomo-bench")
            .join("config.toml")
    })
}

/// Show the active config path (for `locomo config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.memory.top_k, 10);
        assert_eq!(config.memory.min_similarity, 0.0);
        assert_eq!(config.memory.choice_min_similarity, 0.3);
        assert_eq!(config.llm.max_tokens, 100);
        assert_eq!(config.llm.choice_max_tokens, 20);
        assert_eq!(config.pricing.input_per_mtok, 0.014);
        assert_eq!(config.scoring.single_hop, SingleHopMode::Plain);
        assert_eq!(config.retry.max_retries, 2);
        assert!(config.run.clear_sessions);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[memory]
top_k = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.memory.top_k, 5);
        // Other fields should be defaults
        assert_eq!(config.memory.url, "http://localhost:3099/api/v1");
        assert_eq!(config.llm.model, "deepseek-chat");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[memory]
url = "http://memory:8080/api/v1"
top_k = 20
min_similarity = 0.1
choice_min_similarity = 0.5
timeout_secs = 10
domain = "bench"

[llm]
base_url = "http://llm:9000/v1"
model = "local-model"
api_key_env = "LOCAL_KEY"
temperature = 0.2
max_tokens = 64
choice_max_tokens = 8
timeout_secs = 60

[pricing]
input_per_mtok = 0.5
output_per_mtok = 2.0

[scoring]
single_hop = "max_over_fragments"
low_score_threshold = 0.3

[retry]
max_retries = 0
backoff_ms = 10

[run]
clear_sessions = false
workers = 8
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.memory.url, "http://memory:8080/api/v1");
        assert_eq!(config.llm.api_key_env, "LOCAL_KEY");
        assert_eq!(config.pricing.output_per_mtok, 2.0);
        assert_eq!(config.scoring.single_hop, SingleHopMode::MaxOverFragments);
        assert_eq!(config.scoring.low_score_threshold, 0.3);
        assert_eq!(config.retry.max_retries, 0);
        assert!(!config.run.clear_sessions);
        assert_eq!(config.run.workers, 8);
    }

    #[test]
    fn test_unknown_scoring_mode_rejected() {
        let toml_str = r#"
[scoring]
single_hop = "fuzzy"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[run]\nworkers = 2\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.run.workers, 2);

        std::fs::write(&path, "[run\nworkers = ").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let llm = LlmConfig {
            api_key_env: "LOCOMO_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..LlmConfig::default()
        };
        assert!(llm.api_key().is_err());
    }
}
