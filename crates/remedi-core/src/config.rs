//! Client configuration.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $REMEDI_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/remedi/config.toml
//!   3. ~/.config/remedi/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoints: EndpointsConfig,
    pub polling: PollingConfig,
    pub assembly: AssemblyConfig,
    pub requests: RequestConfig,
}

/// Server endpoints. Only translation is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub pre_processing: Option<String>,
    pub translation: String,
    pub post_processing: Option<String>,
}

/// Backoff applied while waiting for a correlated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub initial_wait_ms: u64,
    pub backoff_factor: u32,
    pub max_wait_ms: u64,
    /// Overall limit per awaited response. 0 = wait forever.
    pub timeout_ms: u64,
}

/// How translated sentences and processed chunks are joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub delimiter: String,
    /// Insert a placeholder for anything that did not come back ok.
    pub placeholders: bool,
}

/// Defaults stamped on outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub priority: i32,
    /// Ask the translation server for per-sentence load metrics.
    pub translation_info: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            pre_processing: None,
            translation: "ws://localhost:8090".to_string(),
            post_processing: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_wait_ms: 250,
            backoff_factor: 2,
            max_wait_ms: 4000,
            timeout_ms: 0,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            delimiter: " ".to_string(),
            placeholders: true,
        }
    }
}

impl PollingConfig {
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// `None` when the wait is unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| dirs_or_home(lookup).join(".config"))
        .join("remedi")
}

fn dirs_or_home(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("a translation endpoint must be configured")]
    MissingTranslationEndpoint,
    #[error("invalid polling settings: {0}")]
    InvalidPolling(&'static str),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(process_env)
    }

    /// [`ClientConfig::load`] reading variables through `lookup`.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = Self::file_path_with(&lookup);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            ClientConfig::default()
        };
        config.apply_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        Self::file_path_with(&process_env)
    }

    fn file_path_with(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
        lookup("REMEDI_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir(lookup).join("config.toml"))
    }

    /// Reject settings no client can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.translation.trim().is_empty() {
            return Err(ConfigError::MissingTranslationEndpoint);
        }
        if self.polling.initial_wait_ms == 0 {
            return Err(ConfigError::InvalidPolling("initial_wait_ms must be positive"));
        }
        if self.polling.backoff_factor == 0 {
            return Err(ConfigError::InvalidPolling("backoff_factor must be positive"));
        }
        if self.polling.max_wait_ms < self.polling.initial_wait_ms {
            return Err(ConfigError::InvalidPolling(
                "max_wait_ms must not be below initial_wait_ms",
            ));
        }
        Ok(())
    }

    /// Apply REMEDI_* env var overrides.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("REMEDI_ENDPOINTS__PRE_PROCESSING") {
            self.endpoints.pre_processing = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = lookup("REMEDI_ENDPOINTS__TRANSLATION") {
            self.endpoints.translation = v;
        }
        if let Some(v) = lookup("REMEDI_ENDPOINTS__POST_PROCESSING") {
            self.endpoints.post_processing = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = lookup("REMEDI_POLLING__TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.polling.timeout_ms = ms;
            }
        }
    }
}
