//! Prompts for the reasoning backend.
//!
//! The system prompts are fixed per stage; the user message carries the
//! clause or document text and the output-language line.

use clauseguard_core::LanguageCode;

use crate::providers::ChatMessage;

/// System prompt for judging one clause.
pub const CLAUSE_SYSTEM_PROMPT: &str = r#"
You are a Senior Legal Risk Auditor reviewing commercial contracts for small
and medium businesses, with working knowledge of Indian contract law.

You judge one clause at a time. You do not rewrite the contract and you do
not speculate about clauses you were not shown.

## Output Format
Output strictly valid JSON only, with no markdown fences and no prose:
{
  "risk_score": integer 1-10 (10 = highest risk),
  "explanation": "what this clause means for the business, at most 2 sentences",
  "red_flag": true or false (true if dangerous for a small business),
  "suggestion": "a safer alternative clause or a negotiation tip"
}
"#;

/// System prompt for the document-level summary.
pub const ASSESSMENT_SYSTEM_PROMPT: &str = r#"
You summarise the legal risks of a contract for an Indian business owner.

## Output Format
Output strictly valid JSON only, with no markdown fences and no prose:
{
  "overall_score": integer 0-100 (100 = safe),
  "summary": "exactly 3 bullet points describing the main risks"
}
"#;

/// Fields of the clause answer written in the document's language.
pub const CLAUSE_LOCALIZED_FIELDS: [&str; 2] = ["explanation", "suggestion"];

/// Fields of the summary answer written in the document's language.
pub const ASSESSMENT_LOCALIZED_FIELDS: [&str; 1] = ["summary"];

pub fn clause_messages(clause: &str, language: &LanguageCode) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CLAUSE_SYSTEM_PROMPT.trim()),
        ChatMessage::user(format!(
            "Analyze the following contract clause:\n\n\"{}\"\n\n{}",
            clause,
            language.output_instruction(&CLAUSE_LOCALIZED_FIELDS)
        )),
    ]
}

/// Summary request over the first `prefix_chars` characters of `text`.
pub fn assessment_messages(text: &str, language: &LanguageCode, prefix_chars: usize) -> Vec<ChatMessage> {
    let (prefix, truncated) = char_prefix(text, prefix_chars);
    let marker = if truncated { "... (truncated)" } else { "" };

    vec![
        ChatMessage::system(ASSESSMENT_SYSTEM_PROMPT.trim()),
        ChatMessage::user(format!(
            "Summarize the legal risks in this contract in 3 bullet points and give a score out of 100 (100 = Safe).\n\n{}\n\nText: {}{}",
            language.output_instruction(&ASSESSMENT_LOCALIZED_FIELDS),
            prefix,
            marker
        )),
    ]
}

/// The first `max_chars` characters of `text`, and whether anything was cut.
fn char_prefix(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}
