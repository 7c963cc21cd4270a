//! Cache of remote clause judgments.
//!
//! Only remote answers are stored. Re-analysing the same contract then
//! costs no tokens for clauses already judged, while rule-engine results
//! are always recomputed.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use clauseguard_core::{LanguageCode, RiskJudgment};

/// Clause text and answer language.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JudgmentKey {
    text_hash: u64,
    text_len: usize,
    language: String,
}

impl JudgmentKey {
    pub fn new(clause: &str, language: &LanguageCode) -> Self {
        let mut hasher = DefaultHasher::new();
        clause.hash(&mut hasher);

        Self {
            text_hash: hasher.finish(),
            text_len: clause.len(),
            language: language.as_str().to_string(),
        }
    }
}

/// A remote judgment and the model that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedJudgment {
    pub judgment: RiskJudgment,
    pub model: String,
}

pub struct JudgmentCache {
    cache: Cache<JudgmentKey, CachedJudgment>,
}

impl JudgmentCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &JudgmentKey) -> Option<CachedJudgment> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: JudgmentKey, entry: CachedJudgment) {
        self.cache.insert(key, entry).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate; moka applies pending writes lazily.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for JudgmentCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}
