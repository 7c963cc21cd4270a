//! Entity extraction: parties, dates, money and jurisdictions.
//!
//! Two interchangeable backends implement [`EntityExtractor`]:
//! - [`PatternEntityExtractor`]: regex rules, no external dependencies (default)
//! - [`ModelEntityExtractor`]: maps labels from any [`NerModel`]
//!
//! Extraction never fails. A miss or an unavailable backend yields empty sets.

mod model;
mod patterns;

pub use model::{ModelEntityExtractor, NamedSpan, NerError, NerModel};
pub use patterns::PatternEntityExtractor;

use crate::types::EntityBundle;

/// Extracts an [`EntityBundle`] from raw document text.
pub trait EntityExtractor: Send + Sync {
    /// Short backend identifier for logs (e.g. "pattern").
    fn backend_id(&self) -> &str;

    /// Extract de-duplicated entities. Must not fail.
    fn extract(&self, text: &str) -> EntityBundle;
}

/// Extract entities with the default pattern backend.
pub fn extract_entities(text: &str) -> EntityBundle {
    PatternEntityExtractor::new().extract(text)
}
