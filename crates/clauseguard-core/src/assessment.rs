//! Deterministic document-level assessment.
//!
//! `score = max(40, 90 - 5 * keyword_hits - word_count / 1000)`
//!
//! Each risk keyword counts at most once however often it appears.

use lazy_static::lazy_static;

use crate::types::OverallAssessment;

lazy_static! {
    static ref RISK_KEYWORDS: Vec<&'static str> = vec![
        "termination",
        "liability",
        "indemnity",
        "dispute",
        "court",
        "exclusive",
        "breach",
    ];
}

const BASE_SCORE: i64 = 90;
const FLOOR_SCORE: i64 = 40;
const PENALTY_PER_KEYWORD: i64 = 5;
const WORDS_PER_PENALTY_POINT: usize = 1000;

/// Inputs to the heuristic formula, kept for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentMetrics {
    pub word_count: usize,
    pub keyword_hits: usize,
}

impl DocumentMetrics {
    pub fn measure(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            word_count: text.split_whitespace().count(),
            keyword_hits: RISK_KEYWORDS.iter().filter(|k| lower.contains(*k)).count(),
        }
    }

    /// The heuristic health score, in `40..=90`.
    pub fn score(&self) -> u8 {
        let penalty = PENALTY_PER_KEYWORD * self.keyword_hits as i64
            + (self.word_count / WORDS_PER_PENALTY_POINT) as i64;
        // Clamped to [FLOOR_SCORE, BASE_SCORE], fits in u8.
        (BASE_SCORE - penalty).max(FLOOR_SCORE) as u8
    }
}

/// Produces the assessment used when no remote summary is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAssessor;

impl HeuristicAssessor {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, text: &str) -> OverallAssessment {
        let metrics = DocumentMetrics::measure(text);
        let overall_score = metrics.score();

        tracing::debug!(
            word_count = metrics.word_count,
            keyword_hits = metrics.keyword_hits,
            overall_score,
            "Heuristic assessment computed"
        );

        OverallAssessment {
            overall_score,
            summary: format!(
                "Document analyzed via Local Heuristic Engine ({} words); remote reasoning was unavailable, so this is a degraded assessment. Key risks identified: {} critical terms detected. Recommend manual review of liability sections.",
                metrics.word_count, metrics.keyword_hits
            ),
        }
    }
}

/// Assess a document with the heuristic formula.
pub fn assess_document(text: &str) -> OverallAssessment {
    HeuristicAssessor::new().assess(text)
}
