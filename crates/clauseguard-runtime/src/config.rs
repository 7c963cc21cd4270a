//! Runtime configuration.
//!
//! Loaded once from YAML or JSON, validated, then shared read-only. Every
//! field has a default, so an empty file is a valid configuration.
//!
//! ```yaml
//! models: [gemini-2.0-flash, gemini-1.5-flash]
//! max_concurrency: 4
//! request_timeout: 10s
//! provider:
//!   type: gemini
//!   settings:
//!     base_url: https://generativelanguage.googleapis.com/v1beta
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use clauseguard_core::{language::DEFAULT_SAMPLE_CHARS, segmenter::DEFAULT_MIN_CLAUSE_CHARS};

use crate::providers::DEFAULT_MODELS;
use crate::resilience::{CircuitBreakerConfig, Stage};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Serde adapter for humantime durations ("15s", "1h 30m").
pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Which provider to build and its settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Registry key, e.g. "gemini"
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Provider-specific settings, may hold an API key
    #[serde(default = "empty_settings")]
    pub settings: JsonValue,
}

fn empty_settings() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: "gemini".to_string(),
            settings: empty_settings(),
        }
    }
}

// Settings values stay out of Debug output; only the keys are shown.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self
            .settings
            .as_object()
            .map(|o| o.keys().map(String::as_str).collect())
            .unwrap_or_default();
        f.debug_struct("ProviderConfig")
            .field("provider_type", &self.provider_type)
            .field("settings", &keys)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Tokens available to one analyzer for its whole lifetime, across all
    /// documents, until `reset_budget` is called
    pub global_max_tokens: u32,

    /// Optional caps per stage, within the global cap
    pub stage_max_tokens: HashMap<Stage, u32>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            global_max_tokens: 200_000,
            stage_max_tokens: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Model variants in attempt order
    pub models: Vec<String>,

    /// Clauses scored per document; the rest are dropped
    pub max_clauses: usize,

    /// Clause scoring tasks in flight at once
    pub max_concurrency: usize,

    /// Lines of this many characters or fewer are not clauses
    pub min_clause_chars: usize,

    pub language_sample_chars: usize,

    /// Characters of the document sent for the overall summary
    pub summary_prefix_chars: usize,

    /// Bound on each remote call
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    pub max_tokens: u32,
    pub temperature: f32,

    pub circuit_breaker: CircuitBreakerConfig,
    pub budget: BudgetConfig,
    pub cache: CacheConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            max_clauses: 12,
            max_concurrency: 6,
            min_clause_chars: DEFAULT_MIN_CLAUSE_CHARS,
            language_sample_chars: DEFAULT_SAMPLE_CHARS,
            summary_prefix_chars: 10_000,
            request_timeout: Duration::from_secs(15),
            max_tokens: 800,
            temperature: 0.0,
            circuit_breaker: CircuitBreakerConfig::default(),
            budget: BudgetConfig::default(),
            cache: CacheConfig::default(),
            provider: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&raw)
        } else {
            Self::from_yaml(&raw)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: &str) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            }
        }

        if self.models.iter().all(|m| m.trim().is_empty()) {
            return Err(invalid("models", "at least one model variant is required"));
        }
        if self.max_concurrency == 0 {
            return Err(invalid("max_concurrency", "must be at least 1"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("request_timeout", "must be greater than zero"));
        }
        if self.max_tokens == 0 {
            return Err(invalid("max_tokens", "must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(invalid("temperature", "must be between 0.0 and 2.0"));
        }
        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0 {
            return Err(invalid("circuit_breaker", "thresholds must be at least 1"));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(invalid("cache.max_entries", "must be at least 1 when the cache is enabled"));
        }

        Ok(())
    }
}
