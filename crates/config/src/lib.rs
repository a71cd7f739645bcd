//! Configuration loading, validation, and management for DeepClaw.
//!
//! Loads configuration from `~/.deepclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup — in particular
//! the context-budget arithmetic, which must leave a positive number of
//! tokens available for conversation history.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.deepclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reasoning-engine API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Maximum tokens per reasoning-engine response. Doubles as the
    /// response reserve in the context budget.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Context window budget
    #[serde(default)]
    pub context: ContextConfig,

    /// Execution loop ceilings
    #[serde(default)]
    pub agent: AgentLimitsConfig,

    /// Web search backend
    #[serde(default)]
    pub search: SearchConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Filesystem paths for agent artifacts
    #[serde(default)]
    pub paths: PathsConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    12_000
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("context", &self.context)
            .field("agent", &self.agent)
            .field("search", &self.search)
            .field("gateway", &self.gateway)
            .field("paths", &self.paths)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// Context window budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Maximum context window size in tokens
    #[serde(default = "default_context_tokens")]
    pub max_tokens: usize,

    /// Tokens reserved for the system prompt
    #[serde(default = "default_system_prompt_reserve")]
    pub system_prompt_reserve: usize,

    /// Most-recent messages always retained during trimming
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Tail size of the minimal fallback projection
    #[serde(default = "default_minimal_tail")]
    pub minimal_tail: usize,
}

fn default_context_tokens() -> usize {
    70_000
}
fn default_system_prompt_reserve() -> usize {
    2_000
}
fn default_keep_recent() -> usize {
    8
}
fn default_minimal_tail() -> usize {
    6
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_context_tokens(),
            system_prompt_reserve: default_system_prompt_reserve(),
            keep_recent: default_keep_recent(),
            minimal_tail: default_minimal_tail(),
        }
    }
}

/// Hard ceilings for bounded-mode agents. Infinite mode raises these to
/// effectively unbounded and relies on the external stop phrase instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLimitsConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,

    #[serde(default = "default_max_clarifications")]
    pub max_clarifications: u32,

    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,
}

fn default_max_iterations() -> u64 {
    30
}
fn default_max_clarifications() -> u32 {
    3
}
fn default_max_tool_calls() -> u32 {
    40
}

impl Default for AgentLimitsConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_clarifications: default_max_clarifications(),
            max_tool_calls: default_max_tool_calls(),
        }
    }
}

/// Web search backend (Tavily-compatible JSON API).
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_search_url")]
    pub api_url: String,

    #[serde(default = "default_search_results")]
    pub max_results: u32,
}

fn default_search_url() -> String {
    "https://api.tavily.com/search".into()
}
fn default_search_results() -> u32 {
    5
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_search_url(),
            max_results: default_search_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8010
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Directories for agent artifacts. All default to subdirectories of
/// `~/.deepclaw/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            memory_dir: None,
            reports_dir: None,
            logs_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn memory_dir(&self) -> PathBuf {
        self.memory_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("memory"))
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("reports"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.logs_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("logs"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.deepclaw/config.toml).
    ///
    /// Environment variables take precedence over file values:
    /// - `DEEPCLAW_API_KEY`, then `OPENAI_API_KEY`
    /// - `DEEPCLAW_MODEL`
    /// - `DEEPCLAW_BASE_URL`
    /// - `TAVILY_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("DEEPCLAW_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(model) = std::env::var("DEEPCLAW_MODEL") {
            config.default_model = model;
        }
        if let Ok(url) = std::env::var("DEEPCLAW_BASE_URL") {
            config.base_url = url;
        }
        if config.search.api_key.is_none() {
            config.search.api_key = std::env::var("TAVILY_API_KEY").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
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

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".deepclaw")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        // available_tokens > 0 is a precondition for the whole runtime.
        let reserved = self.context.system_prompt_reserve + self.default_max_tokens as usize;
        if self.context.max_tokens <= reserved {
            return Err(ConfigError::ValidationError(format!(
                "context.max_tokens ({}) must exceed system_prompt_reserve ({}) + default_max_tokens ({})",
                self.context.max_tokens, self.context.system_prompt_reserve, self.default_max_tokens
            )));
        }

        if self.context.minimal_tail == 0 || self.context.keep_recent == 0 {
            return Err(ConfigError::ValidationError(
                "context.keep_recent and context.minimal_tail must be positive".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            context: ContextConfig::default(),
            agent: AgentLimitsConfig::default(),
            search: SearchConfig::default(),
            gateway: GatewayConfig::default(),
            paths: PathsConfig::default(),
        }
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

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
