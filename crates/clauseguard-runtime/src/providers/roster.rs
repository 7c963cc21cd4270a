//! Ordered model variants with a last-known-good hint.
//!
//! Variants are tried in order, each once per call. The variant that last
//! answered successfully is moved to the front of later attempts.

use parking_lot::RwLock;

/// Default variant order.
pub const DEFAULT_MODELS: [&str; 5] = [
    "gemini-2.0-flash",
    "gemini-2.5-flash",
    "gemini-2.0-flash-exp",
    "gemini-1.5-flash",
    "gemini-pro",
];

/// Strip the optional "models/" resource prefix.
pub fn normalize_model(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix("models/").unwrap_or(name)
}

#[derive(Debug)]
pub struct ModelRoster {
    variants: Vec<String>,
    last_good: RwLock<Option<String>>,
}

impl ModelRoster {
    /// Build a roster. Names are normalized; blanks and duplicates are dropped.
    pub fn new<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = Vec::new();
        for variant in variants {
            let name = normalize_model(variant.as_ref());
            if !name.is_empty() && !ordered.iter().any(|v| v == name) {
                ordered.push(name.to_string());
            }
        }

        Self {
            variants: ordered,
            last_good: RwLock::new(None),
        }
    }

    pub fn variants(&self) -> &[String] {
        &self.variants
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Variants in attempt order: last known good first, then the rest in
    /// configured order.
    pub fn candidates(&self) -> Vec<String> {
        let hint = self.last_good.read().clone();
        let mut ordered = Vec::with_capacity(self.variants.len());

        if let Some(good) = hint {
            ordered.push(good);
        }
        for variant in &self.variants {
            if !ordered.contains(variant) {
                ordered.push(variant.clone());
            }
        }
        ordered
    }

    /// Remember the variant that answered. Unknown names are ignored.
    pub fn mark_good(&self, model: &str) {
        let model = normalize_model(model);
        if !self.variants.iter().any(|v| v == model) {
            return;
        }

        let mut hint = self.last_good.write();
        if hint.as_deref() != Some(model) {
            tracing::debug!(model, "Model variant marked last known good");
            *hint = Some(model.to_string());
        }
    }

    pub fn last_good(&self) -> Option<String> {
        self.last_good.read().clone()
    }
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self::new(DEFAULT_MODELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_order() {
        let roster = ModelRoster::default();
        assert_eq!(roster.candidates(), DEFAULT_MODELS.to_vec());
        assert!(roster.last_good().is_none());
    }

    #[test]
    fn test_last_good_moves_to_front() {
        let roster = ModelRoster::default();
        roster.mark_good("gemini-1.5-flash");

        let candidates = roster.candidates();
        assert_eq!(candidates[0], "gemini-1.5-flash");
        assert_eq!(candidates[1], "gemini-2.0-flash");
        assert_eq!(candidates.len(), DEFAULT_MODELS.len());
    }

    #[test]
    fn test_prefix_and_duplicates_normalized() {
        let roster = ModelRoster::new(["models/gemini-pro", "gemini-pro", "  ", "gemini-2.0-flash"]);
        assert_eq!(roster.variants(), ["gemini-pro", "gemini-2.0-flash"]);

        roster.mark_good("models/gemini-2.0-flash");
        assert_eq!(roster.last_good().as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn test_unknown_model_not_marked() {
        let roster = ModelRoster::default();
        roster.mark_good("some-other-model");
        assert!(roster.last_good().is_none());
    }

    proptest! {
        #[test]
        fn prop_candidates_permute_variants_with_hint_first(
            names in proptest::collection::vec("[a-c]{1,2}", 0..8),
            pick in any::<prop::sample::Index>(),
        ) {
            let roster = ModelRoster::new(&names);
            let mut configured = roster.variants().to_vec();

            let hint = (!configured.is_empty()).then(|| pick.get(configured.as_slice()).clone());
            if let Some(hint) = &hint {
                roster.mark_good(hint);
            }

            let candidates = roster.candidates();
            if let Some(hint) = &hint {
                prop_assert_eq!(&candidates[0], hint);
            }

            let mut sorted = candidates.clone();
            sorted.sort();
            configured.sort();
            prop_assert_eq!(sorted, configured);
        }
    }
}
