//! Regex rules for contract entities.
//!
//! The patterns are heuristics tuned for commercial contracts drafted in
//! English, with Indian currency and company-suffix conventions included.

use lazy_static::lazy_static;
use regex::Regex;

use super::EntityExtractor;
use crate::types::EntityBundle;

lazy_static! {
    // =========================================================================
    // MONEY
    // =========================================================================

    /// Currency symbol or code followed by an amount: $100, Rs. 5,000, INR 10,000.50
    static ref MONEY_PATTERN: Regex = Regex::new(
        r"(?:\$|₹|€|£|\bRs\.|\b(?:INR|USD|EUR|GBP))\s?\d+(?:,\d+)*(?:\.\d+)?"
    ).unwrap();

    // =========================================================================
    // DATES
    // =========================================================================

    /// 12/05/2023, 20-10-22, 1 January 2024, 15 Sept 2023
    static ref DATE_PATTERN: Regex = Regex::new(
        r"\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{1,2} (?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{4})\b"
    ).unwrap();

    // =========================================================================
    // PARTIES
    // =========================================================================

    /// Capitalized name followed by a corporate suffix.
    static ref PARTY_PATTERN: Regex = Regex::new(
        r"\b[A-Z][a-z]+ (?:Co\.|Ltd\.|Inc\.|Corp\.|LLP\b|Private Limited\b|Limited\b)"
    ).unwrap();

    /// "between X and Y", used only when no suffixed party is found.
    static ref BETWEEN_PATTERN: Regex = Regex::new(
        r"(?i)\bbetween\s+([^,;\n]+?)\s+and\s+([^,.;\n]+)"
    ).unwrap();

    // =========================================================================
    // JURISDICTIONS
    // =========================================================================

    static ref GOVERNING_LAW_PATTERN: Regex = Regex::new(
        r"\b(?i:laws of (?:the )?(?:state of |republic of |union of )?)([A-Z][a-z]+(?: [A-Z][a-z]+)*)"
    ).unwrap();

    static ref FORUM_PATTERN: Regex = Regex::new(
        r"\b(?i:courts? (?:at|in|of) )([A-Z][a-z]+(?: [A-Z][a-z]+)*)"
    ).unwrap();
}

/// Regex-based extractor, the default backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternEntityExtractor;

impl PatternEntityExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_parties(text: &str, bundle: &mut EntityBundle) {
        bundle
            .parties
            .extend(PARTY_PATTERN.find_iter(text).map(|m| m.as_str().to_string()));

        if !bundle.parties.is_empty() {
            return;
        }

        if let Some(caps) = BETWEEN_PATTERN.captures(text) {
            for group in [1, 2] {
                if let Some(m) = caps.get(group) {
                    let party = m.as_str().trim();
                    if !party.is_empty() {
                        bundle.parties.insert(party.to_string());
                    }
                }
            }
        }
    }

    fn extract_jurisdictions(text: &str, bundle: &mut EntityBundle) {
        for pattern in [&*GOVERNING_LAW_PATTERN, &*FORUM_PATTERN] {
            bundle.jurisdictions.extend(
                pattern
                    .captures_iter(text)
                    .filter_map(|c| c.get(1))
                    .map(|m| m.as_str().to_string()),
            );
        }
    }
}

impl EntityExtractor for PatternEntityExtractor {
    fn backend_id(&self) -> &str {
        "pattern"
    }

    fn extract(&self, text: &str) -> EntityBundle {
        let mut bundle = EntityBundle::new();

        bundle
            .money
            .extend(MONEY_PATTERN.find_iter(text).map(|m| m.as_str().to_string()));
        bundle
            .dates
            .extend(DATE_PATTERN.find_iter(text).map(|m| m.as_str().to_string()));
        Self::extract_parties(text, &mut bundle);
        Self::extract_jurisdictions(text, &mut bundle);

        tracing::debug!(
            parties = bundle.parties.len(),
            dates = bundle.dates.len(),
            money = bundle.money.len(),
            jurisdictions = bundle.jurisdictions.len(),
            "Pattern extraction complete"
        );

        bundle
    }
}
