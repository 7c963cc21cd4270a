//! Data model shared by the deterministic engine and the runtime.
//!
//! A [`Document`] is produced once per analysis run and owns everything
//! derived from the raw text. Re-analysis builds a new document; nothing
//! here is mutated after scoring completes.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest score the rule engine or a remote backend may assign a clause.
pub const MIN_RISK_SCORE: u8 = 1;

/// Highest score the rule engine or a remote backend may assign a clause.
pub const MAX_RISK_SCORE: u8 = 10;

/// Scores above this are surfaced as high risk.
pub const HIGH_RISK_THRESHOLD: u8 = 7;

/// Upper bound of the document health score.
pub const MAX_OVERALL_SCORE: u8 = 100;

/// ISO-639-1 language code of a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Code returned whenever detection fails.
    pub const DEFAULT: &'static str = "en";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable name used in prompt instructions.
    ///
    /// Unknown codes read as English, matching the detector default.
    pub fn display_name(&self) -> &'static str {
        match self.0.as_str() {
            "hi" => "Hindi",
            "bn" => "Bengali",
            "ta" => "Tamil",
            "te" => "Telugu",
            "gu" => "Gujarati",
            "pa" => "Punjabi",
            "kn" => "Kannada",
            "ml" => "Malayalam",
            "mr" => "Marathi",
            "ar" => "Arabic",
            "zh" => "Chinese",
            "ja" => "Japanese",
            "ko" => "Korean",
            "ru" => "Russian",
            "el" => "Greek",
            "fr" => "French",
            "es" => "Spanish",
            "de" => "German",
            "pt" => "Portuguese",
            "it" => "Italian",
            "nl" => "Dutch",
            "pl" => "Polish",
            "tr" => "Turkish",
            "sv" => "Swedish",
            _ => "English",
        }
    }

    pub fn is_english(&self) -> bool {
        self.display_name() == "English"
    }

    /// Instruction line telling a reasoning backend which language to answer in.
    ///
    /// `fields` names the JSON keys whose free text should be localised.
    pub fn output_instruction(&self, fields: &[&str]) -> String {
        let quoted = fields
            .iter()
            .map(|f| format!("'{}'", f))
            .collect::<Vec<_>>()
            .join(" and ");

        if self.is_english() {
            format!("Provide {} in English.", quoted)
        } else {
            format!(
                "IMPORTANT: Provide {} in {}.",
                quoted,
                self.display_name().to_uppercase()
            )
        }
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Risk judgment for a single clause.
///
/// `risk_score` is always in `1..=10`; both the rule engine and the
/// remote response parser enforce this before a judgment is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskJudgment {
    pub risk_score: u8,
    pub explanation: String,
    pub red_flag: bool,
    pub suggestion: String,
}

impl RiskJudgment {
    /// Whether the judgment should be displayed as high risk.
    pub fn is_high_risk(&self) -> bool {
        self.risk_score > HIGH_RISK_THRESHOLD
    }
}

/// Which path produced a judgment or assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Answered by a remote reasoning backend.
    Remote { model: String },

    /// Replayed from the judgment cache; originally answered by `model`.
    Cached { model: String },

    /// Produced by the deterministic rule engine or formula.
    Heuristic,
}

impl Provenance {
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Provenance::Heuristic)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Remote { model } => write!(f, "remote:{}", model),
            Provenance::Cached { model } => write!(f, "cached:{}", model),
            Provenance::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// A minimum-length text segment scored as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Position in the segmented sequence, 0-based.
    pub index: usize,

    pub text: String,

    /// `None` until the clause has been scored.
    pub judgment: Option<RiskJudgment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl Clause {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            judgment: None,
            provenance: None,
        }
    }

    /// Record the result of scoring. Called once per clause.
    pub fn record(&mut self, judgment: RiskJudgment, provenance: Provenance) {
        debug_assert!(self.judgment.is_none(), "clause {} scored twice", self.index);
        self.judgment = Some(judgment);
        self.provenance = Some(provenance);
    }

    pub fn is_scored(&self) -> bool {
        self.judgment.is_some()
    }
}

/// Structured mentions extracted from a document.
///
/// Each category has set semantics; `BTreeSet` keeps iteration order stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBundle {
    #[serde(rename = "PARTIES")]
    pub parties: BTreeSet<String>,

    #[serde(rename = "DATES")]
    pub dates: BTreeSet<String>,

    #[serde(rename = "MONEY")]
    pub money: BTreeSet<String>,

    #[serde(rename = "GPE")]
    pub jurisdictions: BTreeSet<String>,
}

impl EntityBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.parties.is_empty()
            && self.dates.is_empty()
            && self.money.is_empty()
            && self.jurisdictions.is_empty()
    }

    /// Total number of distinct values across all categories.
    pub fn len(&self) -> usize {
        self.parties.len() + self.dates.len() + self.money.len() + self.jurisdictions.len()
    }
}

/// Document-level health score and narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallAssessment {
    /// 0-100, higher is safer.
    pub overall_score: u8,
    pub summary: String,
}

/// One analysed contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub language: LanguageCode,
    pub clauses: Vec<Clause>,
    pub entities: EntityBundle,
    pub assessment: OverallAssessment,
    pub assessment_provenance: Provenance,
    pub analyzed_at: DateTime<Utc>,
}

impl Document {
    /// `(clause_text, judgment)` pairs in clause order. Unscored clauses are skipped.
    pub fn scored_clauses(&self) -> impl Iterator<Item = (&str, &RiskJudgment)> {
        self.clauses
            .iter()
            .filter_map(|c| c.judgment.as_ref().map(|j| (c.text.as_str(), j)))
    }

    /// The first `limit` red-flagged clauses, in clause order.
    pub fn red_flags(&self, limit: usize) -> Vec<&Clause> {
        self.clauses
            .iter()
            .filter(|c| c.judgment.as_ref().is_some_and(|j| j.red_flag))
            .take(limit)
            .collect()
    }

    /// Number of clauses answered by the rule engine rather than a backend.
    pub fn heuristic_clause_count(&self) -> usize {
        self.clauses
            .iter()
            .filter(|c| c.provenance.as_ref().is_some_and(Provenance::is_heuristic))
            .count()
    }
}
