//! Reasoning backend abstractions for clauseguard-runtime.
//!
//! [`LlmProvider`] is the only seam through which remote calls are made.
//! The Gemini implementation is compiled with the `gemini` feature.
//!
//! ## Security
//!
//! Providers hold their keys in [`ApiKey`], which never prints the
//! secret through `Debug` or `Display`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
mod roster;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(test)]
pub(crate) mod mock;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use roster::{normalize_model, ModelRoster, DEFAULT_MODELS};
pub use secrets::{ApiKey, KeyOrigin};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory, GOOGLE_API_KEY_ENV};

/// Errors from reasoning providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request to reasoning backend failed: {0}")]
    HttpError(String),

    #[error("Rate limited by backend (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Backend returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Unreadable backend response: {0}")]
    ParseError(String),

    #[error("Backend rejected the API key")]
    AuthError,

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("No usable provider: {0}")]
    NotConfigured(String),
}

/// Settings for one completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model variant, without any "models/" prefix
    pub model: String,

    pub max_tokens: u32,

    /// 0.0 for the most repeatable output
    pub temperature: f32,

    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODELS[0].to_string(),
            max_tokens: 800,
            temperature: 0.0,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Who a message is from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instructions for the stage
    System,
    User,
    /// A previous model turn
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Response from a completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,

    pub usage: TokenUsage,

    /// Model that answered
    pub model: String,

    pub finish_reason: Option<String>,
}

/// Tokens billed for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A remote reasoning backend: messages in, text out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send `messages` to `config.model` and return the reply text.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Cheap readiness check, no network round trip required.
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Rough prompt size for budget checks, about four bytes per token.
    fn estimate_tokens(&self, text: &str) -> u32 {
        u32::try_from(text.len() / 4).unwrap_or(u32::MAX)
    }
}
