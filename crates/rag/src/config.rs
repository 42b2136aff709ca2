//! Orchestrator configuration management.
//!
//! Every tunable of the query pipeline lives in one struct so that a single
//! orchestrator serves all deployments; `.ragstack/orchestrator.yaml`
//! overrides individual fields.

use ragstack_core::{AppError, AppResult, QueryMode};
use ragstack_prompt::PromptLimits;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on chunks requested from the search service.
pub const MAX_TOP_K: usize = 10;

/// Tunables for the query pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Filename keywords that mark a chunk as system configuration
    #[serde(default = "default_system_keywords")]
    pub system_keywords: Vec<String>,

    /// Similarity floor sent to the search service
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Chunks requested in fast mode
    #[serde(default = "default_fast_top_k")]
    pub fast_top_k: usize,

    /// Chunks requested in detailed mode
    #[serde(default = "default_detailed_top_k")]
    pub detailed_top_k: usize,

    /// Chunks requested in detailed mode when the analysis marks the query complex
    #[serde(default = "default_complex_top_k")]
    pub complex_top_k: usize,

    /// Temperature of the query analysis call
    #[serde(default = "default_analysis_temperature")]
    pub analysis_temperature: f32,

    /// Generation budget of the query analysis call
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: i64,

    /// Lifetime of the derived system context
    #[serde(default = "default_system_context_ttl_secs")]
    pub system_context_ttl_secs: u64,

    /// Query used to retrieve system configuration chunks
    #[serde(default = "default_system_context_query")]
    pub system_context_query: String,

    /// Chunks requested when deriving the system context
    #[serde(default = "default_system_context_top_k")]
    pub system_context_top_k: usize,

    /// History windowing
    #[serde(default)]
    pub prompt: PromptLimits,
}

fn default_system_keywords() -> Vec<String> {
    vec!["system".to_string(), "admin".to_string(), "config".to_string()]
}

fn default_min_similarity() -> f32 {
    0.3
}

fn default_fast_top_k() -> usize {
    5
}

fn default_detailed_top_k() -> usize {
    8
}

fn default_complex_top_k() -> usize {
    10
}

fn default_analysis_temperature() -> f32 {
    0.1
}

fn default_analysis_max_tokens() -> i64 {
    200
}

fn default_system_context_ttl_secs() -> u64 {
    300
}

fn default_system_context_query() -> String {
    "system configuration features architecture capabilities api".to_string()
}

fn default_system_context_top_k() -> usize {
    10
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_keywords: default_system_keywords(),
            min_similarity: default_min_similarity(),
            fast_top_k: default_fast_top_k(),
            detailed_top_k: default_detailed_top_k(),
            complex_top_k: default_complex_top_k(),
            analysis_temperature: default_analysis_temperature(),
            analysis_max_tokens: default_analysis_max_tokens(),
            system_context_ttl_secs: default_system_context_ttl_secs(),
            system_context_query: default_system_context_query(),
            system_context_top_k: default_system_context_top_k(),
            prompt: PromptLimits::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Chunks requested for a mode before any analysis adjustment.
    pub fn top_k(&self, mode: QueryMode) -> usize {
        match mode {
            QueryMode::Fast => self.fast_top_k,
            QueryMode::Detailed => self.detailed_top_k,
        }
    }

    pub fn system_context_ttl(&self) -> Duration {
        Duration::from_secs(self.system_context_ttl_secs)
    }

    /// Validate configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.system_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(AppError::Config(
                "systemKeywords must contain at least one keyword".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(AppError::Config(format!(
                "minSimilarity must be between 0 and 1, got {}",
                self.min_similarity
            )));
        }

        for (name, value) in [
            ("fastTopK", self.fast_top_k),
            ("detailedTopK", self.detailed_top_k),
            ("complexTopK", self.complex_top_k),
            ("systemContextTopK", self.system_context_top_k),
        ] {
            if value == 0 || value > MAX_TOP_K {
                return Err(AppError::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_TOP_K, value
                )));
            }
        }

        if self.system_context_query.trim().is_empty() {
            return Err(AppError::Config(
                "systemContextQuery cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Load orchestrator configuration.
///
/// Loads from `.ragstack/orchestrator.yaml` if it exists, otherwise returns
/// the defaults.
pub fn load_config(workspace: &Path) -> AppResult<OrchestratorConfig> {
    let config_path = get_config_path(workspace);

    if !config_path.exists() {
        tracing::debug!("Using default orchestrator config (no config file found)");
        return Ok(OrchestratorConfig::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let config: OrchestratorConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    config.validate()?;

    tracing::debug!("Loaded orchestrator config from {:?}", config_path);
    Ok(config)
}

/// Save orchestrator configuration.
pub fn save_config(workspace: &Path, config: &OrchestratorConfig) -> AppResult<()> {
    let config_path = get_config_path(workspace);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }

    let yaml = serde_yaml::to_string(config)?;

    fs::write(&config_path, yaml).map_err(|e| {
        AppError::Config(format!("Failed to write config to {:?}: {}", config_path, e))
    })?;

    tracing::debug!("Saved orchestrator config to {:?}", config_path);
    Ok(())
}

/// Get the path to the orchestrator config file.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".ragstack").join("orchestrator.yaml")
}

/// Get the directory holding conversation logs.
pub fn get_conversations_dir(workspace: &Path) -> PathBuf {
    workspace.join(".ragstack").join("conversations")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();

        assert_eq!(config, OrchestratorConfig::default());
        assert_eq!(config.top_k(QueryMode::Fast), 5);
        assert_eq!(config.top_k(QueryMode::Detailed), 8);
        assert_eq!(config.system_context_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let config = OrchestratorConfig {
            fast_top_k: 3,
            system_keywords: vec!["settings".to_string()],
            ..Default::default()
        };

        save_config(temp.path(), &config).unwrap();

        let loaded = load_config(temp.path()).unwrap();
        assert_eq!(loaded.fast_top_k, 3);
        assert_eq!(loaded.system_keywords, vec!["settings"]);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "minSimilarity: 0.5\nprompt:\n  turnCharBudget: 200\n").unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.min_similarity, 0.5);
        assert_eq!(config.prompt.turn_char_budget, 200);
        assert_eq!(config.prompt.fast_history_turns, 3);
        assert_eq!(config.detailed_top_k, 8);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = OrchestratorConfig {
            fast_top_k: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig {
            min_similarity: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OrchestratorConfig {
            system_keywords: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
