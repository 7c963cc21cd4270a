//! One remote question, asked across the model roster.
//!
//! Each variant gets a single attempt, in roster order, skipping variants
//! whose circuit is open. Provider failures move on to the next variant.
//! A reply that arrives but cannot be parsed ends the attempt, since
//! another variant is no more likely to follow the format.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ModelRoster, ProviderError};
use crate::resilience::{BudgetTracker, CircuitBreaker, LlmUsage, Stage};
use crate::response::ResponseError;

/// Why a remote strategy produced nothing. Always recovered by a fallback.
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Unusable reply from {model}: {source}")]
    Response {
        model: String,
        #[source]
        source: ResponseError,
    },

    #[error("Token budget exhausted for {0}")]
    BudgetExceeded(Stage),

    #[error("All model circuits open")]
    CircuitOpen,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("No model variants configured")]
    NoVariants,
}

/// A parsed reply and the variant that produced it.
#[derive(Debug, Clone)]
pub struct RemoteAnswer<T> {
    pub value: T,
    pub model: String,
}

pub struct RemoteBackend {
    provider: Arc<dyn LlmProvider>,
    roster: ModelRoster,
    breaker: CircuitBreaker,
    budget: BudgetTracker,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl RemoteBackend {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig) -> Self {
        let budget = BudgetTracker::with_stage_budgets(
            config.budget.global_max_tokens,
            config.budget.stage_max_tokens.clone(),
        );

        Self {
            provider,
            roster: ModelRoster::new(&config.models),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
            budget,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.request_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn roster(&self) -> &ModelRoster {
        &self.roster
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn usage(&self) -> LlmUsage {
        self.budget.usage()
    }

    pub fn reset_budget(&self) {
        self.budget.reset();
    }

    /// Whether the global budget can no longer cover even the completion
    /// reservation of one call.
    pub fn budget_exhausted(&self) -> bool {
        self.budget.global().left() < self.max_tokens
    }

    /// Ask `messages` and parse the reply with `parse`.
    pub async fn ask<T, F>(
        &self,
        stage: Stage,
        messages: Vec<ChatMessage>,
        parse: F,
    ) -> Result<RemoteAnswer<T>, ScoreError>
    where
        F: Fn(&str) -> Result<T, ResponseError>,
    {
        if self.roster.is_empty() {
            return Err(ScoreError::NoVariants);
        }

        let prompt_chars: String = messages.iter().map(|m| m.content.as_str()).collect();
        let estimated = self
            .provider
            .estimate_tokens(&prompt_chars)
            .saturating_add(self.max_tokens);

        let mut last_error = None;

        for model in self.roster.candidates() {
            if self.breaker.is_open(&model) {
                tracing::debug!(%model, %stage, "Skipping model with open circuit");
                continue;
            }

            if !self.budget.can_afford(stage, estimated) {
                tracing::warn!(%stage, estimated, "Token budget exhausted, skipping remote call");
                return Err(ScoreError::BudgetExceeded(stage));
            }

            let config = CompletionConfig {
                model: model.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                timeout: self.timeout,
            };

            let outcome =
                tokio::time::timeout(self.timeout, self.provider.complete(messages.clone(), &config))
                    .await;

            let response = match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!(%model, %stage, error = %e, "Remote call failed");
                    self.breaker.record_failure(&model);
                    last_error = Some(ScoreError::Provider(e));
                    continue;
                }
                Err(_) => {
                    tracing::warn!(%model, %stage, timeout = ?self.timeout, "Remote call timed out");
                    self.breaker.record_failure(&model);
                    last_error = Some(ScoreError::Timeout(self.timeout));
                    continue;
                }
            };

            self.budget.record_usage(stage, &response.usage, &model);
            self.breaker.record_success(&model);

            return match parse(&response.content) {
                Ok(value) => {
                    self.roster.mark_good(&model);
                    tracing::debug!(%model, %stage, tokens = response.usage.total(), "Remote answer accepted");
                    Ok(RemoteAnswer { value, model })
                }
                Err(source) => {
                    tracing::warn!(%model, %stage, error = %source, "Remote reply rejected");
                    Err(ScoreError::Response { model, source })
                }
            };
        }

        Err(last_error.unwrap_or(ScoreError::CircuitOpen))
    }
}
