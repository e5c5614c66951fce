//! Configuration loading for the ragport CLI.
//!
//! Configuration is merged from three sources, later ones winning:
//! - Optional YAML config file (ragport.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Ambient lookup (env vars, config files) happens only here, at the CLI
//! boundary. The client itself receives connection parameters explicitly and
//! never reads process-wide state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Default service URL when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Main application configuration for the CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the retrieval service
    pub base_url: String,

    /// API credential (opaque bearer token)
    pub api_key: Option<String>,

    /// Name of an environment variable holding the API key (from config file)
    pub api_key_env: Option<String>,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Default query parameters from the config file
    pub query: Option<QueryDefaults>,
}

/// Query parameter defaults from the config file.
///
/// Unset fields fall back to the client's built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryDefaults {
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,

    #[serde(rename = "topKPerCollection")]
    pub top_k_per_collection: Option<usize>,

    #[serde(rename = "relevanceThreshold")]
    pub relevance_threshold: Option<f32>,

    #[serde(rename = "hybridSearch")]
    pub hybrid_search: Option<bool>,

    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    server: Option<ServerConfig>,
    query: Option<QueryDefaults>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    url: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_key_env: None,
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            query: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `RAGPORT_URL`: Base URL of the retrieval service
    /// - `RAGPORT_API_KEY`: API key (bearer token)
    /// - `RAGPORT_CONFIG`: Path to config file
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(config_file) = std::env::var("RAGPORT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Merge YAML config file if present
        if let Some(path) = config.config_file.clone() {
            if path.exists() {
                config = config.merge_yaml(&path)?;
            } else {
                return Err(AppError::Config(format!(
                    "Config file does not exist: {:?}",
                    path
                )));
            }
        }

        // Environment variables override the config file
        if let Ok(url) = std::env::var("RAGPORT_URL") {
            config.base_url = url;
        }

        if let Ok(key) = std::env::var("RAGPORT_API_KEY") {
            config.api_key = Some(key);
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        if let Some(server) = config_file.server {
            if let Some(url) = server.url {
                self.base_url = url;
            }
            self.api_key_env = server.api_key_env;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
        }

        if let Some(query) = config_file.query {
            self.query = Some(query);
        }

        Ok(self)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the
    /// config file.
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        api_key: Option<String>,
        config_file: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(url) = url {
            self.base_url = url;
        }

        if let Some(api_key) = api_key {
            self.api_key = Some(api_key);
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
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

        self
    }

    /// Resolve the API key, preferring the explicit value over the
    /// `apiKeyEnv` indirection from the config file.
    pub fn resolve_api_key(&self) -> AppResult<String> {
        if let Some(ref key) = self.api_key {
            return Ok(key.clone());
        }

        if let Some(ref env_var) = self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Ok(key);
            }
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        Err(AppError::Config(
            "No API key configured. Set RAGPORT_API_KEY or pass --api-key.".to_string(),
        ))
    }

    /// Validate the configuration.
    ///
    /// Tokens are opaque strings; the only assumption the client makes is
    /// that they are non-empty.
    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("Service URL must not be empty".to_string()));
        }

        if let Some(ref key) = self.api_key {
            if key.trim().is_empty() {
                return Err(AppError::Config(
                    "API key must be a non-empty string".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_key.is_none());
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("http://webui.internal:8080".to_string()),
            Some("sk-test".to_string()),
            None,
            None,
            true,
            false,
        );

        assert_eq!(config.base_url, "http://webui.internal:8080");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  url: http://yaml.example:3000\nquery:\n  topK: 8\n  hybridSearch: false\nlogging:\n  level: warn\n  color: false\n"
        )
        .unwrap();

        let config = AppConfig::default()
            .merge_yaml(&file.path().to_path_buf())
            .unwrap();

        assert_eq!(config.base_url, "http://yaml.example:3000");
        assert_eq!(config.log_level, Some("warn".to_string()));
        assert!(config.no_color);

        let query = config.query.unwrap();
        assert_eq!(query.top_k, Some(8));
        assert_eq!(query.hybrid_search, Some(false));
        assert!(query.relevance_threshold.is_none());
    }

    #[test]
    fn test_validate_empty_api_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_url() {
        let mut config = AppConfig::default();
        config.base_url = "".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_api_key_prefers_explicit() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-explicit".to_string());
        config.api_key_env = Some("RAGPORT_TEST_KEY_UNSET".to_string());
        assert_eq!(config.resolve_api_key().unwrap(), "sk-explicit");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let config = AppConfig::default();
        assert!(config.resolve_api_key().is_err());
    }
}
