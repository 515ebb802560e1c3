use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application configuration module
/// This module holds every setting of a translation run. A single `Config`
/// value is built in `main` and handed to the components that need it.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language, free text (e.g. "English"); optional
    #[serde(default)]
    pub source_language: Option<String>,

    /// Target language, free text (e.g. "German")
    pub target_language: String,

    /// Number of cues sent per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Output layout of each translated cue
    #[serde(default)]
    pub output_mode: OutputMode,

    /// Output file or directory requested by the user
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Completion service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Retry settings for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Request timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// How translated text is written into each cue
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    // @mode: Translation on the first line, original below
    #[default]
    Bilingual,
    // @mode: Translation only
    Mono,
}

/// Completion service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    // @field: API key (Ollama accepts any value)
    #[serde(default = "default_api_key")]
    pub api_key: String,

    // @field: OpenAI-compatible base URL, without the /chat/completions suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

/// Retry policy for transient service failures
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds, doubled on each retry
    #[serde(default = "default_retry_delay_ms")]
    pub base_delay_ms: u64,
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << exponent))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Timeout applied to a single completion request
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct TimeoutConfig {
    /// Timeout for requests until the first success (model loading can be slow)
    #[serde(default = "default_first_timeout_secs")]
    pub first_secs: u64,

    /// Timeout for every later request
    #[serde(default = "default_normal_timeout_secs")]
    pub normal_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            first_secs: default_first_timeout_secs(),
            normal_secs: default_normal_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

pub const DEFAULT_BATCH_SIZE: usize = 10;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_api_key() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    // Ollama exposes its OpenAI compatible API under /v1
    "http://localhost:11434/v1".to_string()
}

fn default_model() -> String {
    "gpt-oss:20b".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000 // 2 seconds, doubled on each retry
}

fn default_first_timeout_secs() -> u64 {
    300
}

fn default_normal_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Create a configuration with defaults for everything but the target language
    pub fn new(target_language: impl Into<String>) -> Self {
        Config {
            target_language: target_language.into(),
            ..Config::default()
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language is required"));
        }

        if self.batch_size == 0 {
            return Err(anyhow!("Batch size must be at least 1"));
        }

        if self.service.model.trim().is_empty() {
            return Err(anyhow!("Model name cannot be empty"));
        }

        Url::parse(&self.service.base_url)
            .map_err(|e| anyhow!("Invalid service base URL '{}': {}", self.service.base_url, e))?;

        if !(0.0..=2.0).contains(&self.service.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", self.service.temperature));
        }

        if self.timeouts.first_secs == 0 || self.timeouts.normal_secs == 0 {
            return Err(anyhow!("Timeouts must be greater than zero"));
        }

        Ok(())
    }

    pub fn first_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.first_secs)
    }

    pub fn normal_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.normal_secs)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: None,
            target_language: String::new(),
            batch_size: default_batch_size(),
            output_mode: OutputMode::default(),
            output: None,
            service: ServiceConfig::default(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
