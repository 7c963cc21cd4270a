//! Analysis orchestration.
//!
//! [`ContractAnalyzer`] runs the whole pipeline for one document:
//! 1. Language detection and entity extraction, in parallel
//! 2. Clause segmentation
//! 3. Clause scoring fan-out alongside the overall assessment
//!
//! # Clause fan-out
//! - At most `max_clauses` clauses are scored; the rest are dropped
//! - At most `max_concurrency` scoring tasks run at once
//! - Results are written back by clause index, so order never depends on
//!   completion order
//! - A task that dies is replaced by the rule-engine answer for its clause

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use clauseguard_core::{
    Clause, ClauseSegmenter, Document, EntityBundle, EntityExtractor, LanguageCode,
    LanguageDetector, PatternEntityExtractor, Provenance, RiskJudgment, ScriptLanguageDetector,
};

use crate::assessor::{AssessmentStrategy, OverallAssessor, RemoteAssessmentStrategy};
use crate::backend::RemoteBackend;
use crate::cache::JudgmentCache;
use crate::config::RuntimeConfig;
use crate::providers::{LlmProvider, ProviderRegistry};
use crate::resilience::LlmUsage;
use crate::scorer::{ClauseRiskScorer, RemoteRiskStrategy, RiskStrategy};
use crate::RuntimeError;

/// Scores a document's clauses concurrently.
pub struct ClauseOrchestrator {
    scorer: Arc<ClauseRiskScorer>,
    max_clauses: usize,
    max_concurrency: usize,
}

impl ClauseOrchestrator {
    pub fn new(scorer: Arc<ClauseRiskScorer>, max_clauses: usize, max_concurrency: usize) -> Self {
        Self {
            scorer,
            max_clauses,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn scorer(&self) -> &ClauseRiskScorer {
        &self.scorer
    }

    /// Truncate `clauses` to the cap and record a judgment on each.
    pub async fn score_clauses(&self, clauses: &mut Vec<Clause>, language: &LanguageCode) {
        if clauses.len() > self.max_clauses {
            tracing::debug!(
                total = clauses.len(),
                kept = self.max_clauses,
                "Dropping clauses beyond the cap"
            );
            clauses.truncate(self.max_clauses);
        }
        if clauses.is_empty() {
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (slot, clause) in clauses.iter().enumerate() {
            let scorer = Arc::clone(&self.scorer);
            let semaphore = Arc::clone(&semaphore);
            let text = clause.text.clone();
            let language = language.clone();

            tasks.spawn(async move {
                // The semaphore is never closed; a missing permit only loosens the bound.
                let _permit = semaphore.acquire_owned().await.ok();
                (slot, scorer.score(&text, &language).await)
            });
        }

        let mut results: Vec<Option<(RiskJudgment, Provenance)>> = vec![None; clauses.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => results[slot] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "Clause scoring task failed"),
            }
        }

        for (clause, result) in clauses.iter_mut().zip(results) {
            let (judgment, provenance) = result.unwrap_or_else(|| self.scorer.fallback(&clause.text));
            clause.record(judgment, provenance);
        }
    }
}

/// A finished document and the remote usage it cost.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub document: Document,
    pub usage: LlmUsage,
}

/// Runs the full analysis pipeline. Never fails once built.
///
/// The token budget (`budget.global_max_tokens`) is shared by every
/// analysis this instance runs, not granted per document. Once it is spent,
/// each later analysis is answered by local heuristics alone, with a
/// warning per analysis, until [`ContractAnalyzer::reset_budget`] is
/// called. Long-lived services should reset it per batch or size it for
/// their whole lifetime.
pub struct ContractAnalyzer {
    config: RuntimeConfig,
    detector: Arc<dyn LanguageDetector>,
    extractor: Arc<dyn EntityExtractor>,
    segmenter: ClauseSegmenter,
    orchestrator: ClauseOrchestrator,
    assessor: OverallAssessor,
    backend: Option<Arc<RemoteBackend>>,
}

impl ContractAnalyzer {
    pub fn builder() -> ContractAnalyzerBuilder {
        ContractAnalyzerBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Whether every answer will come from local heuristics.
    pub fn is_offline(&self) -> bool {
        self.backend.is_none() && self.orchestrator.scorer().is_offline()
    }

    pub async fn analyze(&self, text: &str) -> Analysis {
        if self.budget_exhausted() {
            tracing::warn!(
                global_max_tokens = self.config.budget.global_max_tokens,
                "Token budget spent, analysing with local heuristics only until reset_budget"
            );
        }
        let before = self.usage();
        let shared: Arc<str> = Arc::from(text);

        let (language, entities) = tokio::join!(
            tokio::task::spawn_blocking({
                let detector = Arc::clone(&self.detector);
                let text = Arc::clone(&shared);
                move || detector.detect(&text)
            }),
            tokio::task::spawn_blocking({
                let extractor = Arc::clone(&self.extractor);
                let text = Arc::clone(&shared);
                move || extractor.extract(&text)
            }),
        );

        let language = language.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Language detection failed, using default");
            LanguageCode::default()
        });
        let entities = entities.unwrap_or_else(|e| {
            tracing::warn!(backend = self.extractor.backend_id(), error = %e, "Entity extraction failed");
            EntityBundle::new()
        });

        let mut clauses = self.segmenter.segment(text);

        let (_, (assessment, assessment_provenance)) = tokio::join!(
            self.orchestrator.score_clauses(&mut clauses, &language),
            self.assessor.assess(text, &language),
        );

        let document = Document {
            text: text.to_string(),
            language,
            clauses,
            entities,
            assessment,
            assessment_provenance,
            analyzed_at: chrono::Utc::now(),
        };
        let usage = self.usage().since(&before);

        tracing::info!(
            language = %document.language,
            clauses = document.clauses.len(),
            heuristic_clauses = document.heuristic_clause_count(),
            overall_score = document.assessment.overall_score,
            assessment = %document.assessment_provenance,
            llm_calls = usage.llm_calls,
            tokens = usage.total_tokens,
            "Analysis complete"
        );

        Analysis { document, usage }
    }

    /// Cumulative remote usage of this analyzer.
    pub fn usage(&self) -> LlmUsage {
        self.backend
            .as_ref()
            .map(|b| b.usage())
            .unwrap_or_default()
    }

    /// Whether remote calls are being skipped for lack of budget.
    pub fn budget_exhausted(&self) -> bool {
        self.backend.as_ref().is_some_and(|b| b.budget_exhausted())
    }

    /// Reset the token budget for a new batch of documents.
    pub fn reset_budget(&self) {
        if let Some(backend) = &self.backend {
            backend.reset_budget();
        }
    }
}

/// Builder for [`ContractAnalyzer`].
///
/// Without a provider, and without a `provider` section in the config,
/// the analyzer runs offline.
pub struct ContractAnalyzerBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
    detector: Option<Arc<dyn LanguageDetector>>,
    extractor: Option<Arc<dyn EntityExtractor>>,
    risk_strategy: Option<Arc<dyn RiskStrategy>>,
    assessment_strategy: Option<Arc<dyn AssessmentStrategy>>,
}

impl ContractAnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RuntimeConfig::default(),
            detector: None,
            extractor: None,
            risk_strategy: None,
            assessment_strategy: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the remote clause strategy built from the provider.
    pub fn risk_strategy(mut self, strategy: Arc<dyn RiskStrategy>) -> Self {
        self.risk_strategy = Some(strategy);
        self
    }

    /// Replace the remote assessment strategy built from the provider.
    pub fn assessment_strategy(mut self, strategy: Arc<dyn AssessmentStrategy>) -> Self {
        self.assessment_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<ContractAnalyzer, RuntimeError> {
        let config = self.config;
        config.validate()?;

        let provider = match (self.provider, &config.provider) {
            (Some(provider), _) => Some(provider),
            (None, Some(settings)) => Some(
                ProviderRegistry::with_defaults()
                    .create(&settings.provider_type, &settings.settings)?,
            ),
            (None, None) => None,
        };

        let backend = provider.map(|p| Arc::new(RemoteBackend::new(p, &config)));

        let risk_strategy = self.risk_strategy.or_else(|| {
            backend
                .as_ref()
                .map(|b| Arc::new(RemoteRiskStrategy::new(Arc::clone(b))) as Arc<dyn RiskStrategy>)
        });
        let assessment_strategy = self.assessment_strategy.or_else(|| {
            backend.as_ref().map(|b| {
                Arc::new(RemoteAssessmentStrategy::new(
                    Arc::clone(b),
                    config.summary_prefix_chars,
                )) as Arc<dyn AssessmentStrategy>
            })
        });

        let cache = (config.cache.enabled && risk_strategy.is_some())
            .then(|| Arc::new(JudgmentCache::new(config.cache.max_entries, config.cache.ttl)));

        let scorer = Arc::new(ClauseRiskScorer::new(risk_strategy, cache));

        tracing::debug!(
            provider = backend.as_ref().map(|b| b.provider_name()).unwrap_or("none"),
            models = config.models.len(),
            max_clauses = config.max_clauses,
            max_concurrency = config.max_concurrency,
            "Contract analyzer built"
        );

        Ok(ContractAnalyzer {
            detector: self.detector.unwrap_or_else(|| {
                Arc::new(ScriptLanguageDetector::with_sample(config.language_sample_chars))
            }),
            extractor: self
                .extractor
                .unwrap_or_else(|| Arc::new(PatternEntityExtractor::new())),
            segmenter: ClauseSegmenter::new(config.min_clause_chars),
            orchestrator: ClauseOrchestrator::new(scorer, config.max_clauses, config.max_concurrency),
            assessor: OverallAssessor::new(assessment_strategy),
            backend,
            config,
        })
    }
}

impl Default for ContractAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
