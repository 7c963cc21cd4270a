//! # clauseguard-core
//!
//! Deterministic contract risk analysis engine.
//!
//! This crate turns extracted contract text into a scored [`Document`]:
//! - Which language is it written in?
//! - Who are the parties, and what amounts, dates and jurisdictions appear?
//! - How risky is each clause, and how healthy is the contract overall?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No I/O**: Remote reasoning lives in `clauseguard-runtime`
//! 3. **Total**: Every clause gets a judgment, every document an assessment
//!
//! ## Example
//!
//! ```rust,ignore
//! use clauseguard_core::analyze;
//!
//! let document = analyze(&std::fs::read_to_string("contract.txt")?);
//! for (text, judgment) in document.scored_clauses() {
//!     println!("[{}] {}", judgment.risk_score, text);
//! }
//! println!("Health: {}/100", document.assessment.overall_score);
//! ```

pub mod assessment;
pub mod entities;
pub mod language;
pub mod rules;
pub mod segmenter;
pub mod sink;
pub mod types;

// Re-export main types at crate root
pub use assessment::{assess_document, DocumentMetrics, HeuristicAssessor};
pub use entities::{
    extract_entities, EntityExtractor, ModelEntityExtractor, NamedSpan, NerError, NerModel,
    PatternEntityExtractor,
};
pub use language::{detect_language, LanguageDetector, ScriptLanguageDetector};
pub use rules::{score_clause, RiskRule, RuleEngine};
pub use segmenter::{split_into_clauses, ClauseSegmenter};
pub use sink::{AnalysisRecord, AnalysisSink, JsonSink, SinkError};
pub use types::{
    Clause, Document, EntityBundle, LanguageCode, OverallAssessment, Provenance, RiskJudgment,
    HIGH_RISK_THRESHOLD, MAX_OVERALL_SCORE, MAX_RISK_SCORE, MIN_RISK_SCORE,
};

use chrono::Utc;

/// Clauses scored per document.
pub const DEFAULT_MAX_CLAUSES: usize = 12;

/// Analyze a document entirely offline.
///
/// Every clause is scored by the [`RuleEngine`] and the assessment comes
/// from the heuristic formula. Only the first [`DEFAULT_MAX_CLAUSES`]
/// clauses are kept.
pub fn analyze(text: &str) -> Document {
    analyze_with(
        text,
        &ScriptLanguageDetector::new(),
        &PatternEntityExtractor::new(),
        &ClauseSegmenter::default(),
        DEFAULT_MAX_CLAUSES,
    )
}

/// Offline analysis with explicit components.
pub fn analyze_with(
    text: &str,
    detector: &dyn LanguageDetector,
    extractor: &dyn EntityExtractor,
    segmenter: &ClauseSegmenter,
    max_clauses: usize,
) -> Document {
    let language = detector.detect(text);
    let entities = extractor.extract(text);

    let engine = RuleEngine::new();
    let mut clauses = segmenter.segment(text);
    clauses.truncate(max_clauses);
    for clause in &mut clauses {
        let judgment = engine.score(&clause.text);
        clause.record(judgment, Provenance::Heuristic);
    }

    let assessment = HeuristicAssessor::new().assess(text);

    tracing::info!(
        clauses = clauses.len(),
        language = %language,
        provenance = "heuristic",
        "Offline analysis complete"
    );

    Document {
        text: text.to_string(),
        language,
        clauses,
        entities,
        assessment,
        assessment_provenance: Provenance::Heuristic,
        analyzed_at: Utc::now(),
    }
}
