//! Test providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, Role, TokenUsage};

type Responder = Box<dyn Fn(&[ChatMessage], &str) -> Result<String, ProviderError> + Send + Sync>;
type Delay = Box<dyn Fn(&[ChatMessage]) -> Duration + Send + Sync>;

/// Provider whose replies are computed from the request.
pub struct ScriptedProvider {
    responder: Responder,
    delay: Option<Delay>,
    models: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(
        responder: impl Fn(&[ChatMessage], &str) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: None,
            models: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn always(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_, _| Ok(reply.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_, _| Err(ProviderError::HttpError("connection refused".to_string())))
    }

    pub fn with_delay(
        mut self,
        delay: impl Fn(&[ChatMessage]) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    /// Models requested so far, in call order.
    pub fn models_called(&self) -> Vec<String> {
        self.models.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.models.lock().len()
    }

    /// Highest number of concurrent calls observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// The user message of a request.
pub fn user_text(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.models.lock().push(config.model.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(&messages)).await;
        }
        let reply = (self.responder)(&messages, &config.model);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        reply.map(|content| CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            },
            model: config.model.clone(),
            finish_reason: Some("STOP".to_string()),
        })
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
