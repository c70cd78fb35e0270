//! Configuration loading, validation, and management for Palaver.
//!
//! Loads configuration from `~/.palaver/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.palaver/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Conversation buffer and round loop settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Memory service settings
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend kind (only "ollama" is built in)
    #[serde(default = "default_provider_kind")]
    pub kind: String,

    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Whole-request timeout for completion calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider_kind() -> String {
    "ollama".into()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "qwen2.5:7b".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            base_url: default_ollama_url(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Memory service session this chat belongs to
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Maximum messages kept in the rolling buffer, system prompt included
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Maximum query rounds per user turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Base system prompt (recalled memories are appended per turn)
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_session_id() -> String {
    "default".into()
}
fn default_capacity() -> usize {
    20
}
fn default_max_rounds() -> usize {
    5
}
fn default_system_prompt() -> String {
    "You are a thoughtful conversational companion. \
     You may call the tools you are given when they help answer the user. \
     You can call another tool after you have received the results of earlier calls, \
     but it is not required, and you must stop calling tools once you notice you are looping."
        .into()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            capacity: default_capacity(),
            max_rounds: default_max_rounds(),
            system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "http", "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    #[serde(default = "default_memory_url")]
    pub base_url: String,

    /// Upper bound on each memory call; expiry counts as failure
    #[serde(default = "default_memory_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    #[serde(default = "default_vector_search_limit")]
    pub vector_search_limit: usize,

    #[serde(default = "default_vector_search_threshold")]
    pub vector_search_threshold: f32,

    #[serde(default = "default_long_term_threshold")]
    pub long_term_threshold: f32,
}

/// Memory backends the CLI knows how to build.
pub const MEMORY_BACKENDS: &[&str] = &["http", "in_memory", "none"];

fn default_memory_backend() -> String {
    "http".into()
}
fn default_memory_url() -> String {
    "http://localhost:5042/api/v1".into()
}
fn default_memory_timeout_secs() -> u64 {
    5
}
fn default_result_limit() -> usize {
    2
}
fn default_vector_search_limit() -> usize {
    10
}
fn default_vector_search_threshold() -> f32 {
    0.4
}
fn default_long_term_threshold() -> f32 {
    0.6
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            base_url: default_memory_url(),
            timeout_secs: default_memory_timeout_secs(),
            result_limit: default_result_limit(),
            vector_search_limit: default_vector_search_limit(),
            vector_search_threshold: default_vector_search_threshold(),
            long_term_threshold: default_long_term_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.palaver/config.toml).
    ///
    /// Environment variables override the file:
    /// - `PALAVER_MODEL`
    /// - `PALAVER_OLLAMA_URL`
    /// - `PALAVER_MEMORY_URL`
    /// - `PALAVER_SESSION_ID`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&Self::config_path(), |key| std::env::var(key).ok())
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_from(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply overrides, then validate the merged result once.
    fn load_with(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::read_from(path)?;
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("PALAVER_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = lookup("PALAVER_OLLAMA_URL") {
            self.provider.base_url = url;
        }
        if let Some(url) = lookup("PALAVER_MEMORY_URL") {
            self.memory.base_url = url;
        }
        if let Some(session) = lookup("PALAVER_SESSION_ID") {
            self.conversation.session_id = session;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".palaver")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversation.capacity < 2 {
            return Err(ConfigError::ValidationError(
                "conversation.capacity must be at least 2 (system prompt plus one message)".into(),
            ));
        }

        if self.conversation.max_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "conversation.max_rounds must be at least 1".into(),
            ));
        }

        if self.conversation.session_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversation.session_id must not be empty".into(),
            ));
        }

        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.kind != "ollama" {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider kind '{}' (expected \"ollama\")",
                self.provider.kind
            )));
        }

        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}' (expected one of {:?})",
                self.memory.backend, MEMORY_BACKENDS
            )));
        }

        for (name, value) in [
            ("memory.vector_search_threshold", self.memory.vector_search_threshold),
            ("memory.long_term_threshold", self.memory.long_term_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        if self.memory.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "memory.timeout_secs must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Write the default configuration to `path` unless a file already exists.
    ///
    /// Returns `true` if a file was written.
    pub fn write_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(path, Self::default_toml()).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(true)
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
