//! # clauseguard-runtime
//!
//! Remote-reasoning analysis for ClauseGuard.
//!
//! This crate asks a language-model backend to judge each clause and to
//! summarise the whole contract, and falls back to the deterministic
//! engine in `clauseguard-core` whenever the backend cannot answer.
//!
//! ## Important
//!
//! Analysis never fails. A missing API key, an exhausted token budget, a
//! timeout or a malformed reply all degrade to local heuristics, and each
//! result records which path produced it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use clauseguard_runtime::{ContractAnalyzer, RuntimeConfig};
//!
//! let analyzer = ContractAnalyzer::builder()
//!     .config(RuntimeConfig::from_file("clauseguard.yaml")?)
//!     .build()?;
//!
//! let analysis = analyzer.analyze(&text).await;
//! println!("Health: {}/100", analysis.document.assessment.overall_score);
//! ```

use thiserror::Error;

pub mod assessor;
pub mod backend;
pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod response;
pub mod scorer;

pub use assessor::{AssessmentStrategy, OverallAssessor, RemoteAssessmentStrategy};
pub use backend::{RemoteAnswer, RemoteBackend, ScoreError};
pub use cache::{CachedJudgment, JudgmentCache, JudgmentKey};
pub use config::{BudgetConfig, CacheConfig, ConfigError, ProviderConfig, RuntimeConfig};
pub use orchestrator::{Analysis, ClauseOrchestrator, ContractAnalyzer, ContractAnalyzerBuilder};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, ProviderFactory,
    ProviderRegistry, Role, TokenUsage,
};
pub use resilience::{BudgetTracker, CircuitBreaker, CircuitBreakerConfig, LlmUsage, Stage};
pub use response::ResponseError;
pub use scorer::{ClauseRiskScorer, RemoteRiskStrategy, RiskStrategy};

/// Errors building a [`ContractAnalyzer`].
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Provider unavailable: {0}")]
    Provider(#[from] ProviderError),
}
