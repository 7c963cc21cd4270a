//! Deterministic clause rule engine.
//!
//! Answers for every clause the remote backend cannot. Rules are checked
//! in a fixed order and the first match wins:
//!
//! | Order | Keywords | Score | Red flag |
//! |-------|----------|-------|----------|
//! | 1 | indemnify, indemnity, limit of liability | 8 | yes |
//! | 2 | terminate, termination, cancellation | 6 | no |
//! | 3 | exclusive, non-compete, solicit | 7 | yes |
//! | 4 | (none) | `min(4, chars / 200) + 1` | no |
//!
//! Keyword lists and scores are a fixed contract; downstream consumers
//! rely on the exact values.

use lazy_static::lazy_static;

use crate::types::RiskJudgment;

lazy_static! {
    static ref INDEMNITY_KEYWORDS: Vec<&'static str> =
        vec!["indemnify", "indemnity", "limit of liability"];

    static ref TERMINATION_KEYWORDS: Vec<&'static str> =
        vec!["terminate", "termination", "cancellation"];

    static ref EXCLUSIVITY_KEYWORDS: Vec<&'static str> =
        vec!["exclusive", "non-compete", "solicit"];
}

/// Characters per step of the length-based score.
const CHARS_PER_STEP: usize = 200;

/// Largest step added by the length rule, giving scores 1-5.
const MAX_LENGTH_STEP: usize = 4;

/// Which rule decided a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskRule {
    Indemnity,
    Termination,
    Exclusivity,
    Length,
}

impl RiskRule {
    /// Classify clause text. Matching is case-insensitive substring search.
    pub fn classify(clause: &str) -> Self {
        let lower = clause.to_lowercase();
        let hit = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if hit(INDEMNITY_KEYWORDS.as_slice()) {
            RiskRule::Indemnity
        } else if hit(TERMINATION_KEYWORDS.as_slice()) {
            RiskRule::Termination
        } else if hit(EXCLUSIVITY_KEYWORDS.as_slice()) {
            RiskRule::Exclusivity
        } else {
            RiskRule::Length
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RiskRule::Indemnity => "indemnity",
            RiskRule::Termination => "termination",
            RiskRule::Exclusivity => "exclusivity",
            RiskRule::Length => "length",
        }
    }
}

/// Score for the length rule: `min(4, chars / 200) + 1`.
pub fn length_score(chars: usize) -> u8 {
    // Bounded by MAX_LENGTH_STEP + 1, so the cast cannot truncate.
    ((chars / CHARS_PER_STEP).min(MAX_LENGTH_STEP) + 1) as u8
}

/// The fallback scorer. Pure and infallible.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score one clause.
    pub fn score(&self, clause: &str) -> RiskJudgment {
        let rule = RiskRule::classify(clause);
        tracing::debug!(rule = rule.name(), "Rule engine scored clause");

        match rule {
            RiskRule::Indemnity => RiskJudgment {
                risk_score: 8,
                explanation:
                    "Indemnity/Liability detected. High risk detected via heuristic analysis."
                        .to_string(),
                red_flag: true,
                suggestion: "Ensure there is a cap on liability.".to_string(),
            },
            RiskRule::Termination => RiskJudgment {
                risk_score: 6,
                explanation: "Termination clause detected. Review notice periods.".to_string(),
                red_flag: false,
                suggestion: "Seek mutual termination rights.".to_string(),
            },
            RiskRule::Exclusivity => RiskJudgment {
                risk_score: 7,
                explanation: "Exclusivity or Non-compete detected. May limit business growth."
                    .to_string(),
                red_flag: true,
                suggestion: "Limit the duration and geography.".to_string(),
            },
            RiskRule::Length => {
                let chars = clause.chars().count();
                RiskJudgment {
                    risk_score: length_score(chars),
                    explanation: format!(
                        "Standard clause of {} chars. Base heuristic check passed.",
                        chars
                    ),
                    red_flag: false,
                    suggestion: "Standard legal wording. Ensure alignment with business goals."
                        .to_string(),
                }
            }
        }
    }
}

/// Score a clause with the rule engine.
pub fn score_clause(clause: &str) -> RiskJudgment {
    RuleEngine::new().score(clause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MAX_RISK_SCORE, MIN_RISK_SCORE};
    use proptest::prelude::*;

    #[test]
    fn test_indemnity_scenario() {
        let j = score_clause("This Agreement shall be subject to an indemnity obligation by the Vendor.");
        assert_eq!(j.risk_score, 8);
        assert!(j.red_flag);
        assert_eq!(j.suggestion, "Ensure there is a cap on liability.");
    }

    #[test]
    fn test_termination_scenario() {
        let j = score_clause("Either party may terminate this agreement with 30 days notice.");
        assert_eq!(j.risk_score, 6);
        assert!(!j.red_flag);
    }

    #[test]
    fn test_exclusivity() {
        let j = score_clause("The Distributor shall act as the EXCLUSIVE reseller in the territory.");
        assert_eq!(j.risk_score, 7);
        assert!(j.red_flag);

        let j = score_clause("Employee shall not solicit any customer for two years.");
        assert_eq!(RiskRule::classify("Employee shall not solicit"), RiskRule::Exclusivity);
        assert_eq!(j.risk_score, 7);
    }

    #[test]
    fn test_first_match_wins() {
        // Mentions termination and exclusivity too, but indemnity is checked first.
        let clause = "On termination the exclusive licensee shall indemnify the licensor.";
        assert_eq!(RiskRule::classify(clause), RiskRule::Indemnity);
        assert_eq!(score_clause(clause).risk_score, 8);

        let clause = "Cancellation ends the exclusive arrangement.";
        assert_eq!(score_clause(clause).risk_score, 6);
    }

    #[test]
    fn test_limit_of_liability_phrase() {
        assert_eq!(RiskRule::classify("The LIMIT OF LIABILITY is one month of fees."), RiskRule::Indemnity);
    }

    #[test]
    fn test_length_rule() {
        assert_eq!(length_score(0), 1);
        assert_eq!(length_score(199), 1);
        assert_eq!(length_score(200), 2);
        assert_eq!(length_score(799), 4);
        assert_eq!(length_score(800), 5);
        assert_eq!(length_score(10_000), 5);

        let clause = "a".repeat(450);
        let j = score_clause(&clause);
        assert_eq!(j.risk_score, 3);
        assert!(!j.red_flag);
        assert_eq!(j.explanation, "Standard clause of 450 chars. Base heuristic check passed.");
    }

    proptest! {
        #[test]
        fn prop_score_in_range(clause in ".{0,1200}") {
            let j = score_clause(&clause);
            prop_assert!(j.risk_score >= MIN_RISK_SCORE && j.risk_score <= MAX_RISK_SCORE);
        }

        #[test]
        fn prop_length_rule_formula_and_monotonic(a in 0usize..3000, b in 0usize..3000) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            let s = score_clause(&"x".repeat(short));
            let l = score_clause(&"x".repeat(long));
            prop_assert_eq!(s.risk_score as usize, (short / 200).min(4) + 1);
            prop_assert!(s.risk_score <= l.risk_score);
        }

        #[test]
        fn prop_deterministic(clause in "\\PC{0,400}") {
            prop_assert_eq!(score_clause(&clause), score_clause(&clause));
        }
    }
}
