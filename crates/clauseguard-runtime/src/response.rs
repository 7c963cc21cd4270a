//! Parsing of backend replies.
//!
//! Replies must be a JSON object, optionally wrapped in markdown code
//! fences. Anything else, including scores outside their range, is
//! rejected and the caller falls back to local heuristics. There is no
//! best-effort repair.

use serde::Deserialize;
use thiserror::Error;

use clauseguard_core::{OverallAssessment, RiskJudgment, MAX_OVERALL_SCORE, MAX_RISK_SCORE, MIN_RISK_SCORE};

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("reply is not the expected JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Remove ```json and ``` fences anywhere in the reply, then trim.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

#[derive(Debug, Deserialize)]
struct JudgmentReply {
    risk_score: i64,
    explanation: String,
    red_flag: bool,
    suggestion: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryText {
    Text(String),
    Points(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct AssessmentReply {
    overall_score: i64,
    summary: SummaryText,
}

pub fn parse_judgment(raw: &str) -> Result<RiskJudgment, ResponseError> {
    let reply: JudgmentReply = serde_json::from_str(&strip_code_fences(raw))?;

    let range = i64::from(MIN_RISK_SCORE)..=i64::from(MAX_RISK_SCORE);
    if !range.contains(&reply.risk_score) {
        return Err(ResponseError::OutOfRange {
            field: "risk_score",
            value: reply.risk_score,
        });
    }

    Ok(RiskJudgment {
        // Range-checked above
        risk_score: reply.risk_score as u8,
        explanation: reply.explanation,
        red_flag: reply.red_flag,
        suggestion: reply.suggestion,
    })
}

pub fn parse_assessment(raw: &str) -> Result<OverallAssessment, ResponseError> {
    let reply: AssessmentReply = serde_json::from_str(&strip_code_fences(raw))?;

    if !(0..=i64::from(MAX_OVERALL_SCORE)).contains(&reply.overall_score) {
        return Err(ResponseError::OutOfRange {
            field: "overall_score",
            value: reply.overall_score,
        });
    }

    let summary = match reply.summary {
        SummaryText::Text(text) => text,
        SummaryText::Points(points) => points.join("\n"),
    };

    Ok(OverallAssessment {
        overall_score: reply.overall_score as u8,
        summary,
    })
}
