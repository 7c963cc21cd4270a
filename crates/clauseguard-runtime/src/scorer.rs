//! Clause risk scoring: remote first, rule engine on any failure.

use async_trait::async_trait;
use std::sync::Arc;

use clauseguard_core::{LanguageCode, Provenance, RiskJudgment, RuleEngine};

use crate::backend::{RemoteBackend, ScoreError};
use crate::cache::{CachedJudgment, JudgmentCache, JudgmentKey};
use crate::prompts;
use crate::resilience::Stage;
use crate::response;

/// A way of judging a clause that may fail.
#[async_trait]
pub trait RiskStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Judge `clause`, answering in `language`. Returns the model used.
    async fn judge(&self, clause: &str, language: &LanguageCode) -> Result<(RiskJudgment, String), ScoreError>;
}

/// Judges clauses through a [`RemoteBackend`].
pub struct RemoteRiskStrategy {
    backend: Arc<RemoteBackend>,
}

impl RemoteRiskStrategy {
    pub fn new(backend: Arc<RemoteBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RiskStrategy for RemoteRiskStrategy {
    fn name(&self) -> &str {
        self.backend.provider_name()
    }

    async fn judge(&self, clause: &str, language: &LanguageCode) -> Result<(RiskJudgment, String), ScoreError> {
        let answer = self
            .backend
            .ask(
                Stage::ClauseRisk,
                prompts::clause_messages(clause, language),
                response::parse_judgment,
            )
            .await?;
        Ok((answer.value, answer.model))
    }
}

/// Scores one clause. Never fails.
///
/// Order: judgment cache, remote strategy, rule engine. Only remote
/// answers are cached.
pub struct ClauseRiskScorer {
    remote: Option<Arc<dyn RiskStrategy>>,
    rules: RuleEngine,
    cache: Option<Arc<JudgmentCache>>,
}

impl ClauseRiskScorer {
    /// Scorer that only uses the rule engine.
    pub fn offline() -> Self {
        Self {
            remote: None,
            rules: RuleEngine::new(),
            cache: None,
        }
    }

    pub fn new(remote: Option<Arc<dyn RiskStrategy>>, cache: Option<Arc<JudgmentCache>>) -> Self {
        Self {
            remote,
            rules: RuleEngine::new(),
            cache,
        }
    }

    pub fn is_offline(&self) -> bool {
        self.remote.is_none()
    }

    pub async fn score(&self, clause: &str, language: &LanguageCode) -> (RiskJudgment, Provenance) {
        let Some(remote) = &self.remote else {
            return self.fallback(clause);
        };

        let key = JudgmentKey::new(clause, language);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(model = %hit.model, "Clause judgment served from cache");
                return (hit.judgment, Provenance::Cached { model: hit.model });
            }
        }

        match remote.judge(clause, language).await {
            Ok((judgment, model)) => {
                if let Some(cache) = &self.cache {
                    cache
                        .insert(
                            key,
                            CachedJudgment {
                                judgment: judgment.clone(),
                                model: model.clone(),
                            },
                        )
                        .await;
                }
                (judgment, Provenance::Remote { model })
            }
            Err(e) => {
                tracing::warn!(strategy = remote.name(), error = %e, "Clause falling back to rule engine");
                self.fallback(clause)
            }
        }
    }

    /// The rule-engine answer for `clause`.
    pub fn fallback(&self, clause: &str) -> (RiskJudgment, Provenance) {
        (self.rules.score(clause), Provenance::Heuristic)
    }
}
