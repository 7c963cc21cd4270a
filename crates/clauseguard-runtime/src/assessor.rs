//! Document-level assessment: remote summary first, heuristic formula on
//! any failure.

use async_trait::async_trait;
use std::sync::Arc;

use clauseguard_core::{HeuristicAssessor, LanguageCode, OverallAssessment, Provenance};

use crate::backend::{RemoteBackend, ScoreError};
use crate::prompts;
use crate::resilience::Stage;
use crate::response;

#[async_trait]
pub trait AssessmentStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Assess `text`, answering in `language`. Returns the model used.
    async fn assess(&self, text: &str, language: &LanguageCode) -> Result<(OverallAssessment, String), ScoreError>;
}

/// Summarises the first `prefix_chars` characters through a [`RemoteBackend`].
pub struct RemoteAssessmentStrategy {
    backend: Arc<RemoteBackend>,
    prefix_chars: usize,
}

impl RemoteAssessmentStrategy {
    pub fn new(backend: Arc<RemoteBackend>, prefix_chars: usize) -> Self {
        Self {
            backend,
            prefix_chars,
        }
    }
}

#[async_trait]
impl AssessmentStrategy for RemoteAssessmentStrategy {
    fn name(&self) -> &str {
        self.backend.provider_name()
    }

    async fn assess(&self, text: &str, language: &LanguageCode) -> Result<(OverallAssessment, String), ScoreError> {
        let answer = self
            .backend
            .ask(
                Stage::OverallAssessment,
                prompts::assessment_messages(text, language, self.prefix_chars),
                response::parse_assessment,
            )
            .await?;
        Ok((answer.value, answer.model))
    }
}

/// Produces the document assessment. Never fails.
pub struct OverallAssessor {
    remote: Option<Arc<dyn AssessmentStrategy>>,
    heuristic: HeuristicAssessor,
}

impl OverallAssessor {
    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn new(remote: Option<Arc<dyn AssessmentStrategy>>) -> Self {
        Self {
            remote,
            heuristic: HeuristicAssessor::new(),
        }
    }

    pub async fn assess(&self, text: &str, language: &LanguageCode) -> (OverallAssessment, Provenance) {
        if let Some(remote) = &self.remote {
            match remote.assess(text, language).await {
                Ok((assessment, model)) => return (assessment, Provenance::Remote { model }),
                Err(e) => {
                    tracing::warn!(strategy = remote.name(), error = %e, "Assessment falling back to heuristic formula");
                }
            }
        }

        (self.heuristic.assess(text), Provenance::Heuristic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::providers::mock::{user_text, ScriptedProvider};
    use crate::providers::LlmProvider;

    fn assessor_with(provider: Arc<dyn LlmProvider>) -> OverallAssessor {
        let config = RuntimeConfig::default();
        let backend = Arc::new(RemoteBackend::new(provider, &config));
        OverallAssessor::new(Some(Arc::new(RemoteAssessmentStrategy::new(
            backend,
            config.summary_prefix_chars,
        ))))
    }

    fn contract_with_2500_words() -> String {
        let mut text = String::from("Termination for breach; liability is capped. ");
        text.push_str(&"clause ".repeat(2494));
        text
    }

    #[tokio::test]
    async fn test_remote_failure_uses_formula() {
        let text = contract_with_2500_words();
        assert_eq!(text.split_whitespace().count(), 2500);

        let assessor = assessor_with(Arc::new(ScriptedProvider::failing()));
        let (assessment, provenance) = assessor.assess(&text, &LanguageCode::default()).await;

        assert_eq!(assessment.overall_score, 73);
        assert!(assessment.summary.contains("2500 words"));
        assert!(assessment.summary.contains("3 critical terms"));
        assert_eq!(provenance, Provenance::Heuristic);
    }

    #[tokio::test]
    async fn test_remote_summary_list() {
        let reply = r#"{"overall_score": 55, "summary": ["Uncapped indemnity", "Unilateral termination", "Exclusive forum abroad"]}"#;
        let assessor = assessor_with(Arc::new(ScriptedProvider::always(reply)));
        let (assessment, provenance) = assessor
            .assess("Short contract text.", &LanguageCode::new("hi"))
            .await;

        assert_eq!(assessment.overall_score, 55);
        assert_eq!(assessment.summary, "Uncapped indemnity\nUnilateral termination\nExclusive forum abroad");
        assert!(matches!(provenance, Provenance::Remote { .. }));
    }

    #[tokio::test]
    async fn test_prompt_carries_prefix_and_language() {
        let provider = Arc::new(ScriptedProvider::new(|messages, _| {
            let user = user_text(messages);
            assert!(user.contains("in HINDI"));
            assert!(user.contains("... (truncated)"));
            Ok(r#"{"overall_score": 80, "summary": "ok"}"#.to_string())
        }));
        let assessor = assessor_with(provider);
        let long = "a".repeat(20_000);
        let (assessment, _) = assessor.assess(&long, &LanguageCode::new("hi")).await;
        assert_eq!(assessment.overall_score, 80);
    }

    #[tokio::test]
    async fn test_offline() {
        let (assessment, provenance) = OverallAssessor::offline()
            .assess("", &LanguageCode::default())
            .await;
        assert_eq!(assessment.overall_score, 90);
        assert!(provenance.is_heuristic());
    }
}
