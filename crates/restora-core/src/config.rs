//! Configuration file support.
//!
//! Provides configuration structure and loading for the API credential,
//! model selection and output preferences.

use restora_models::{DEFAULT_BASE_URL, DEFAULT_MODEL_ID, GeminiImageModel};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default directory restored images are written to.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Log levels accepted in configuration.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Restora configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoraConfig {
    /// API key for the image service
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default)]
    pub model: Option<String>,

    /// API root of the image service
    #[serde(default)]
    pub base_url: Option<String>,

    /// Directory restored images are written to
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    ReadError(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl RestoraConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::ReadError(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("Failed to write file: {}", e)))?;

        Ok(())
    }

    /// Get default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".restora")
            .join("config.toml")
    }

    /// Get default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".restorarc")
    }

    /// Discover and load configuration files, then apply environment overrides.
    ///
    /// Loads configuration from:
    /// 1. Global config (~/.restora/config.toml)
    /// 2. Local config (./.restorarc)
    /// 3. Environment variables
    ///
    /// Later sources override earlier ones. Unreadable files are skipped.
    pub fn discover_and_load() -> Self {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            match Self::load_from_file(&path) {
                Ok(file_config) => config.merge(&file_config),
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => tracing::warn!(error = %e, "Ignoring configuration file"),
            }
        }

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Load an explicit configuration file, then apply environment overrides.
    pub fn load_explicit(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref api_key) = other.api_key {
            self.api_key = Some(api_key.clone());
        }
        if let Some(ref model) = other.model {
            self.model = Some(model.clone());
        }
        if let Some(ref base_url) = other.base_url {
            self.base_url = Some(base_url.clone());
        }
        if let Some(ref output_dir) = other.output_dir {
            self.output_dir = Some(output_dir.clone());
        }
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        if let Some(timeout_secs) = other.timeout_secs {
            self.timeout_secs = Some(timeout_secs);
        }
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// `GEMINI_API_KEY` takes precedence over `API_KEY`. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = get("RESTORA_MODEL") {
            self.model = Some(model);
        }
        if let Some(base_url) = get("RESTORA_BASE_URL") {
            self.base_url = Some(base_url);
        }
        if let Some(output_dir) = get("RESTORA_OUTPUT_DIR") {
            self.output_dir = Some(output_dir);
        }
    }

    /// Validates configured values.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "log_level must be one of {}, got '{}'",
                    LOG_LEVELS.join(", "),
                    level
                )));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }
        if let Some(ref model) = self.model {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidValue("model cannot be empty".to_string()));
            }
        }
        Ok(())
    }

    /// The configured model, or the default one.
    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL_ID)
    }

    /// The configured API root, or the public endpoint.
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// The configured output directory, or the working directory.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(self.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR))
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Builds the Gemini image model described by this configuration.
    pub fn build_model(&self) -> GeminiImageModel {
        let model = GeminiImageModel::new(self.model_id(), self.api_key.clone())
            .with_base_url(self.base_url());
        match self.timeout() {
            Some(timeout) => model.with_timeout(timeout),
            None => model,
        }
    }

    /// The API key with all but its last four characters hidden.
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| {
            let chars: Vec<char> = key.chars().collect();
            if chars.len() <= 4 {
                "*".repeat(chars.len())
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("{}{}", "*".repeat(chars.len() - 4), tail)
            }
        })
    }
}
