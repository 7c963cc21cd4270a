//! Token budgets for remote calls.
//!
//! A global allowance caps spend for the lifetime of an analyzer; optional
//! per-stage allowances split it between clause scoring and the document
//! summary. A call that cannot be afforded is not made.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::providers::TokenUsage;

/// Pipeline stage a remote call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ClauseRisk,
    OverallAssessment,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ClauseRisk => "clause_risk",
            Stage::OverallAssessment => "overall_assessment",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-name fragment and USD per million (prompt, completion) tokens.
/// Checked in order; the first fragment contained in the model name wins.
const PRICE_TABLE: &[(&str, f64, f64)] = &[
    ("2.5-flash", 0.30, 2.50),
    ("2.0-flash", 0.10, 0.40),
    ("1.5-flash", 0.075, 0.30),
    ("pro", 0.50, 1.50),
];

const UNLISTED_PRICE: (f64, f64) = (0.10, 0.40);

/// Estimated USD cost of one call on `model`.
pub fn price_call(usage: &TokenUsage, model: &str) -> f64 {
    let (prompt_rate, completion_rate) = PRICE_TABLE
        .iter()
        .find(|(fragment, _, _)| model.contains(fragment))
        .map(|&(_, prompt, completion)| (prompt, completion))
        .unwrap_or(UNLISTED_PRICE);

    let per_token = |tokens: u32, rate: f64| f64::from(tokens) * rate / 1_000_000.0;
    per_token(usage.prompt_tokens, prompt_rate) + per_token(usage.completion_tokens, completion_rate)
}

/// A cap on tokens with a lock-free running total.
#[derive(Debug)]
pub struct Allowance {
    cap: u32,
    spent: AtomicU32,
}

impl Allowance {
    pub fn new(cap: u32) -> Self {
        Self {
            cap,
            spent: AtomicU32::new(0),
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn spent(&self) -> u32 {
        self.spent.load(Ordering::Acquire)
    }

    pub fn left(&self) -> u32 {
        self.cap.saturating_sub(self.spent())
    }

    pub fn allows(&self, tokens: u32) -> bool {
        tokens <= self.left()
    }

    /// Add `tokens` to the running total, saturating at `u32::MAX`.
    pub fn charge(&self, tokens: u32) {
        let _ = self
            .spent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |spent| {
                Some(spent.saturating_add(tokens))
            });
    }

    fn clear(&self) {
        self.spent.store(0, Ordering::Release);
    }
}

/// Accumulated remote usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,

    /// Completed remote calls, including ones whose reply was unusable
    pub llm_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    /// Fold one completed call into the totals.
    pub fn record_call(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.llm_calls = self.llm_calls.saturating_add(1);
        self.estimated_cost += price_call(usage, model);
    }

    /// Usage accrued since `earlier` was snapshotted.
    pub fn since(&self, earlier: &LlmUsage) -> LlmUsage {
        LlmUsage {
            total_tokens: self.total_tokens.saturating_sub(earlier.total_tokens),
            prompt_tokens: self.prompt_tokens.saturating_sub(earlier.prompt_tokens),
            completion_tokens: self.completion_tokens.saturating_sub(earlier.completion_tokens),
            llm_calls: self.llm_calls.saturating_sub(earlier.llm_calls),
            estimated_cost: (self.estimated_cost - earlier.estimated_cost).max(0.0),
        }
    }
}

/// Global and per-stage allowances plus the usage ledger.
pub struct BudgetTracker {
    global: Allowance,
    per_stage: HashMap<Stage, Allowance>,
    ledger: RwLock<LlmUsage>,
}

impl BudgetTracker {
    /// Global cap only.
    pub fn new(global_cap: u32) -> Self {
        Self::with_stage_budgets(global_cap, HashMap::new())
    }

    pub fn with_stage_budgets(global_cap: u32, stage_caps: HashMap<Stage, u32>) -> Self {
        Self {
            global: Allowance::new(global_cap),
            per_stage: stage_caps
                .into_iter()
                .map(|(stage, cap)| (stage, Allowance::new(cap)))
                .collect(),
            ledger: RwLock::new(LlmUsage::default()),
        }
    }

    /// Whether both the stage allowance (if any) and the global one have
    /// room for `estimated_tokens`.
    pub fn can_afford(&self, stage: Stage, estimated_tokens: u32) -> bool {
        self.tokens_left(stage) >= estimated_tokens
    }

    pub fn record_usage(&self, stage: Stage, usage: &TokenUsage, model: &str) {
        let tokens = usage.total();
        self.global.charge(tokens);
        if let Some(allowance) = self.per_stage.get(&stage) {
            allowance.charge(tokens);
        }
        self.ledger.write().record_call(usage, model);
    }

    pub fn usage(&self) -> LlmUsage {
        self.ledger.read().clone()
    }

    /// Tokens `stage` may still spend: the smaller of its own allowance and
    /// the global one.
    pub fn tokens_left(&self, stage: Stage) -> u32 {
        let global = self.global.left();
        match self.per_stage.get(&stage) {
            Some(allowance) => allowance.left().min(global),
            None => global,
        }
    }

    pub fn global(&self) -> &Allowance {
        &self.global
    }

    pub fn reset(&self) {
        self.global.clear();
        self.per_stage.values().for_each(Allowance::clear);
        *self.ledger.write() = LlmUsage::default();
    }
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new(200_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(prompt: u32, completion: u32) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
        }
    }

    #[test]
    fn test_allowance_charges_down_to_zero() {
        let allowance = Allowance::new(500);
        assert!(allowance.allows(500));

        allowance.charge(350);
        assert_eq!(allowance.left(), 150);
        assert!(allowance.allows(150));
        assert!(!allowance.allows(151));

        allowance.charge(400);
        assert_eq!(allowance.left(), 0);
        assert_eq!(allowance.spent(), 750);
    }

    #[test]
    fn test_allowance_saturates() {
        let allowance = Allowance::new(10);
        allowance.charge(u32::MAX);
        allowance.charge(5);
        assert_eq!(allowance.spent(), u32::MAX);
        assert_eq!(allowance.left(), 0);
    }

    #[test]
    fn test_summary_stage_has_its_own_cap() {
        let tracker = BudgetTracker::with_stage_budgets(
            2_000,
            HashMap::from([(Stage::OverallAssessment, 400)]),
        );

        tracker.record_usage(Stage::OverallAssessment, &call(250, 100), "gemini-2.0-flash");
        assert_eq!(tracker.tokens_left(Stage::OverallAssessment), 50);
        assert!(!tracker.can_afford(Stage::OverallAssessment, 51));

        // Clause scoring only sees the global remainder.
        assert_eq!(tracker.tokens_left(Stage::ClauseRisk), 1_650);
        assert!(tracker.can_afford(Stage::ClauseRisk, 1_650));
    }

    #[test]
    fn test_clause_spend_starves_summary() {
        let tracker = BudgetTracker::with_stage_budgets(
            1_000,
            HashMap::from([(Stage::OverallAssessment, 800)]),
        );
        for _ in 0..3 {
            tracker.record_usage(Stage::ClauseRisk, &call(250, 50), "gemini-2.0-flash");
        }

        assert_eq!(tracker.tokens_left(Stage::OverallAssessment), 100);
        assert!(!tracker.can_afford(Stage::OverallAssessment, 200));
        assert_eq!(tracker.usage().llm_calls, 3);

        tracker.reset();
        assert_eq!(tracker.tokens_left(Stage::OverallAssessment), 800);
        assert_eq!(tracker.usage(), LlmUsage::default());
    }

    #[test]
    fn test_price_table() {
        let million_each = call(1_000_000, 1_000_000);
        assert!((price_call(&million_each, "gemini-2.5-flash") - 2.80).abs() < 1e-9);
        assert!((price_call(&million_each, "gemini-1.5-pro-latest") - 2.00).abs() < 1e-9);
        assert!((price_call(&million_each, "someone-elses-model") - 0.50).abs() < 1e-9);

        let prompt_only = call(1_000_000, 0);
        assert!((price_call(&prompt_only, "models/gemini-2.0-flash-exp") - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_ledger_delta_between_runs() {
        let mut ledger = LlmUsage::default();
        ledger.record_call(&call(900, 120), "gemini-2.0-flash");
        let before_second_run = ledger.clone();
        ledger.record_call(&call(40, 8), "gemini-2.0-flash");
        ledger.record_call(&call(60, 12), "gemini-2.0-flash");

        let delta = ledger.since(&before_second_run);
        assert_eq!(delta.llm_calls, 2);
        assert_eq!(delta.prompt_tokens, 100);
        assert_eq!(delta.total_tokens, 120);
        assert!(delta.estimated_cost > 0.0);
    }
}
