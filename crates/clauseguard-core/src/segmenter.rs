//! Line-based clause segmentation.
//!
//! Boundaries are heuristic: a clause is a trimmed line longer than the
//! minimum length. They need not line up with the contract's own numbering.

use crate::types::Clause;

/// Lines of this many characters or fewer are not clauses.
pub const DEFAULT_MIN_CLAUSE_CHARS: usize = 50;

/// Splits document text into ordered clause candidates.
#[derive(Debug, Clone, Copy)]
pub struct ClauseSegmenter {
    min_chars: usize,
}

impl ClauseSegmenter {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Segment `text` into clause strings, in document order.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.lines()
            .map(str::trim)
            .filter(|line| line.chars().count() > self.min_chars)
            .collect()
    }

    /// Segment `text` into unscored [`Clause`]s indexed from 0.
    pub fn segment(&self, text: &str) -> Vec<Clause> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, line)| Clause::new(index, line))
            .collect()
    }
}

impl Default for ClauseSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CLAUSE_CHARS)
    }
}

/// Segment with the default threshold.
pub fn split_into_clauses(text: &str) -> Vec<Clause> {
    ClauseSegmenter::default().segment(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_A: &str = "1. The Supplier shall deliver the goods within thirty days of the order.";
    const LONG_B: &str = "2. Payment shall be made within fifteen days of receipt of a valid invoice.";

    #[test]
    fn test_short_lines_dropped() {
        let text = format!("MASTER SERVICES AGREEMENT\n\n{}\nSigned\n{}\n", LONG_A, LONG_B);
        let clauses = split_into_clauses(&text);

        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].index, 0);
        assert_eq!(clauses[0].text, LONG_A);
        assert_eq!(clauses[1].index, 1);
        assert!(clauses.iter().all(|c| c.judgment.is_none()));
    }

    #[test]
    fn test_lines_trimmed_and_crlf_handled() {
        let text = format!("   {}   \r\n\t{}\r\n", LONG_A, LONG_B);
        let clauses = ClauseSegmenter::default().split(&text);
        assert_eq!(clauses, vec![LONG_A, LONG_B]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let exactly = "x".repeat(50);
        let above = "x".repeat(51);
        let text = format!("{}\n{}", exactly, above);
        let clauses = ClauseSegmenter::default().split(&text);
        assert_eq!(clauses, vec![above.as_str()]);
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        // 30 Devanagari characters are 90 bytes but fall under the threshold.
        let line = "क".repeat(30);
        assert!(ClauseSegmenter::default().split(&line).is_empty());
    }

    #[test]
    fn test_empty_document() {
        assert!(split_into_clauses("").is_empty());
        assert!(split_into_clauses("\n\n   \n").is_empty());
    }
}
