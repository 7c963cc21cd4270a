//! Adapter from a general-purpose named-entity recognizer to an [`EntityBundle`].

use thiserror::Error;

use super::EntityExtractor;
use crate::types::EntityBundle;

/// Errors a recognizer backend may report.
#[derive(Error, Debug)]
pub enum NerError {
    #[error("NER model unavailable: {0}")]
    Unavailable(String),

    #[error("NER inference failed: {0}")]
    Inference(String),
}

/// A labelled span returned by a recognizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSpan {
    /// Model label, e.g. "ORG", "PERSON", "DATE", "MONEY", "GPE".
    pub label: String,
    pub text: String,
}

impl NamedSpan {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A named-entity recognizer.
pub trait NerModel: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, text: &str) -> Result<Vec<NamedSpan>, NerError>;
}

/// Extractor backed by an [`NerModel`].
///
/// Organisation and person labels become parties, date labels dates,
/// monetary labels money and geopolitical labels jurisdictions. Other
/// labels are dropped. Model failures produce an empty bundle.
pub struct ModelEntityExtractor<M> {
    model: M,
}

impl<M: NerModel> ModelEntityExtractor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    fn file(bundle: &mut EntityBundle, span: NamedSpan) {
        let text = span.text.trim();
        if text.is_empty() {
            return;
        }

        let category = match span.label.to_ascii_uppercase().as_str() {
            "ORG" | "PERSON" | "PER" => &mut bundle.parties,
            "DATE" => &mut bundle.dates,
            "MONEY" => &mut bundle.money,
            "GPE" => &mut bundle.jurisdictions,
            _ => return,
        };
        category.insert(text.to_string());
    }
}

impl<M: NerModel> EntityExtractor for ModelEntityExtractor<M> {
    fn backend_id(&self) -> &str {
        self.model.name()
    }

    fn extract(&self, text: &str) -> EntityBundle {
        let mut bundle = EntityBundle::new();

        match self.model.recognize(text) {
            Ok(spans) => {
                for span in spans {
                    Self::file(&mut bundle, span);
                }
            }
            Err(e) => {
                tracing::warn!(model = self.model.name(), error = %e, "NER model failed, returning empty entities");
            }
        }

        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(Vec<NamedSpan>);

    impl NerModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, _text: &str) -> Result<Vec<NamedSpan>, NerError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenModel;

    impl NerModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn recognize(&self, _text: &str) -> Result<Vec<NamedSpan>, NerError> {
            Err(NerError::Unavailable("weights not loaded".to_string()))
        }
    }

    #[test]
    fn test_labels_map_to_categories() {
        let extractor = ModelEntityExtractor::new(FixedModel(vec![
            NamedSpan::new("ORG", "Acme Ltd."),
            NamedSpan::new("PERSON", "Ravi Kumar"),
            NamedSpan::new("date", "1 March 2024"),
            NamedSpan::new("MONEY", "$500"),
            NamedSpan::new("GPE", "India"),
            NamedSpan::new("NORP", "Indian"),
            NamedSpan::new("ORG", "Acme Ltd."),
            NamedSpan::new("ORG", "   "),
        ]));

        let bundle = extractor.extract("irrelevant");
        assert_eq!(bundle.parties.len(), 2);
        assert!(bundle.dates.contains("1 March 2024"));
        assert!(bundle.money.contains("$500"));
        assert!(bundle.jurisdictions.contains("India"));
        assert_eq!(bundle.len(), 5);
        assert_eq!(extractor.backend_id(), "fixed");
    }

    #[test]
    fn test_model_failure_yields_empty_bundle() {
        let extractor = ModelEntityExtractor::new(BrokenModel);
        assert!(extractor.extract("Acme Ltd. pays $100.").is_empty());
    }
}
