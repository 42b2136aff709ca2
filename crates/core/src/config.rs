//! Configuration management for ragstack.
//!
//! Configuration is merged from several layers, later layers winning:
//! - Built-in defaults
//! - Config file (`.ragstack/config.yaml` or `RAGSTACK_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with local state stored in `.ragstack/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default vector search service (the document server's `/search` route).
pub const DEFAULT_SEARCH_URL: &str = "http://localhost:3000";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .ragstack/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Default generation model identifier
    pub model: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Upstream service endpoints and timeouts
    pub services: ServicesConfig,
}

/// Endpoints and timeouts of the two upstream collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Base URL of the vector search service
    #[serde(rename = "searchUrl", default = "default_search_url")]
    pub search_url: String,

    /// Base URL of the Ollama generation backend
    #[serde(rename = "ollamaUrl", default = "default_ollama_url")]
    pub ollama_url: String,

    /// Search request timeout; kept short for interactive use
    #[serde(rename = "searchTimeoutSecs", default = "default_search_timeout")]
    pub search_timeout_secs: u64,

    /// Generation request timeout
    #[serde(rename = "generationTimeoutSecs", default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_search_timeout() -> u64 {
    5
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            ollama_url: default_ollama_url(),
            search_timeout_secs: default_search_timeout(),
            generation_timeout_secs: default_generation_timeout(),
        }
    }
}

impl ServicesConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    model: Option<String>,
    services: Option<ServicesConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            model: "llama3.2".to_string(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
            services: ServicesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration using the workspace and config file named by the
    /// environment (`RAGSTACK_WORKSPACE`, `RAGSTACK_CONFIG`).
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicit workspace and/or config file.
    ///
    /// Environment variables:
    /// - `RAGSTACK_WORKSPACE`: Workspace path when `workspace` is `None`
    /// - `RAGSTACK_CONFIG`: Config file when `config_file` is `None`
    /// - `RAGSTACK_MODEL`: Generation model
    /// - `MCP_SERVER_URL`: Vector search service base URL
    /// - `OLLAMA_HOST`: Ollama base URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use ragstack_core::config::AppConfig;
    ///
    /// let config = AppConfig::load_from(None, None).expect("Failed to load config");
    /// println!("Search service: {}", config.services.search_url);
    /// ```
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("RAGSTACK_WORKSPACE")) {
            config.workspace = workspace;
        }
        config.config_file = config_file.or_else(|| env_path("RAGSTACK_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.ragstack_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(model) = std::env::var("RAGSTACK_MODEL") {
            config.model = model;
        }

        if let Ok(url) = std::env::var("MCP_SERVER_URL") {
            config.services.search_url = url;
        }

        if let Ok(url) = std::env::var("OLLAMA_HOST") {
            config.services.ollama_url = url;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        if let Some(model) = config_file.model {
            result.model = model;
        }

        if let Some(services) = config_file.services {
            result.services = services;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over everything else.
    pub fn with_overrides(
        mut self,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        log_json: bool,
    ) -> Self {
        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if log_json {
            self.log_json = true;
        }

        self
    }

    /// Get the path to the .ragstack directory.
    pub fn ragstack_dir(&self) -> PathBuf {
        self.workspace.join(".ragstack")
    }

    /// Ensure the .ragstack directory exists.
    pub fn ensure_ragstack_dir(&self) -> AppResult<()> {
        let dir = self.ragstack_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .ragstack directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the configuration before any service is contacted.
    pub fn validate(&self) -> AppResult<()> {
        if self.model.trim().is_empty() {
            return Err(AppError::Config("Model identifier cannot be empty".to_string()));
        }

        for (name, url) in [
            ("searchUrl", &self.services.search_url),
            ("ollamaUrl", &self.services.ollama_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "Invalid {}: {}. Expected an http:// or https:// URL",
                    name, url
                )));
            }
        }

        if self.services.search_timeout_secs == 0 || self.services.generation_timeout_secs == 0 {
            return Err(AppError::Config(
                "Service timeouts must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.services.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.services.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.services.search_timeout(), Duration::from_secs(5));
        assert_eq!(config.services.generation_timeout(), Duration::from_secs(60));
        assert!(!config.verbose);
    }

    #[test]
    fn test_ragstack_dir() {
        let config = AppConfig::default();
        assert!(config.ragstack_dir().ends_with(".ragstack"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("mistral".to_string()),
            None,
            true,
            false,
            true,
        );

        assert_eq!(config.model, "mistral");
        assert!(config.verbose);
        assert!(config.log_json);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml_services() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
model: llama2
services:
  searchUrl: http://search.internal:3000
  generationTimeoutSecs: 90
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.model, "llama2");
        assert_eq!(config.services.search_url, "http://search.internal:3000");
        assert_eq!(config.services.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.services.search_timeout_secs, 5);
        assert_eq!(config.services.generation_timeout_secs, 90);
        assert_eq!(config.log_level, Some("warn".to_string()));
        assert!(config.no_color);
    }

    #[test]
    fn test_merge_yaml_rejects_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, "services: 42").unwrap();

        assert!(AppConfig::default().merge_yaml(&path).is_err());
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let result = AppConfig::load_from(Some(PathBuf::from("/definitely/not/here")), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.services.search_url = "localhost:3000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.services.search_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(AppConfig::default().validate().is_ok());
    }
}
