//! Building providers by name from JSON settings.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create("gemini", &serde_json::json!({ "api_key": "..." }))?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Creates one kind of provider from settings.
pub trait ProviderFactory: Send + Sync {
    /// Name used in `provider.type`, e.g. "gemini".
    fn kind(&self) -> &'static str;

    /// Check settings without building a provider.
    fn check(&self, settings: &JsonValue) -> Result<(), ProviderError>;

    fn build(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Settings to try when the user configured none. Credentials are
    /// expected to come from the environment.
    fn template(&self) -> JsonValue {
        JsonValue::Object(Default::default())
    }
}

/// Provider factories in priority order.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: Vec<Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every provider compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "gemini")]
        registry.register(Arc::new(super::GeminiProviderFactory));
        registry
    }

    /// Add a factory. One with the same kind is replaced in place, keeping
    /// its priority.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        match self.factories.iter_mut().find(|f| f.kind() == factory.kind()) {
            Some(slot) => *slot = factory,
            None => self.factories.push(factory),
        }
    }

    pub fn create(&self, kind: &str, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.lookup(kind)?;
        factory.check(settings)?;
        factory.build(settings)
    }

    pub fn validate(&self, kind: &str, settings: &JsonValue) -> Result<(), ProviderError> {
        self.lookup(kind)?.check(settings)
    }

    /// Registered kinds, highest priority first.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.kind()).collect()
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.factories.iter().any(|f| f.kind() == kind)
    }

    pub fn template(&self, kind: &str) -> Option<JsonValue> {
        self.lookup(kind).ok().map(|f| f.template())
    }

    /// The highest-priority kind whose template passes its own check, with
    /// that template. `None` when no backend is usable without explicit
    /// settings.
    pub fn first_usable(&self) -> Option<(&'static str, JsonValue)> {
        self.factories.iter().find_map(|factory| {
            let settings = factory.template();
            match factory.check(&settings) {
                Ok(()) => Some((factory.kind(), settings)),
                Err(e) => {
                    tracing::debug!(kind = factory.kind(), error = %e, "Provider not usable from environment");
                    None
                }
            }
        })
    }

    fn lookup(&self, kind: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories
            .iter()
            .find(|f| f.kind() == kind)
            .ok_or_else(|| {
                let known = self.kinds();
                let known = if known.is_empty() { "none".to_string() } else { known.join(", ") };
                ProviderError::NotConfigured(format!(
                    "No provider named '{}' in this build (known: {})",
                    kind, known
                ))
            })
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::ScriptedProvider;

    /// Usable only when `reply` is a string.
    struct EchoFactory {
        kind: &'static str,
        template_reply: Option<&'static str>,
    }

    impl ProviderFactory for EchoFactory {
        fn kind(&self) -> &'static str {
            self.kind
        }

        fn check(&self, settings: &JsonValue) -> Result<(), ProviderError> {
            match settings.get("reply") {
                Some(JsonValue::String(_)) => Ok(()),
                _ => Err(ProviderError::NotConfigured("reply must be a string".to_string())),
            }
        }

        fn build(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            let reply = settings["reply"].as_str().unwrap_or_default();
            Ok(Arc::new(ScriptedProvider::always(reply)))
        }

        fn template(&self) -> JsonValue {
            match self.template_reply {
                Some(reply) => serde_json::json!({ "reply": reply }),
                None => serde_json::json!({}),
            }
        }
    }

    fn echo(kind: &'static str, template_reply: Option<&'static str>) -> Arc<dyn ProviderFactory> {
        Arc::new(EchoFactory { kind, template_reply })
    }

    #[test]
    fn test_create_checks_settings_first() {
        let mut registry = ProviderRegistry::new();
        registry.register(echo("echo", None));

        assert!(registry.create("echo", &serde_json::json!({ "reply": 7 })).is_err());
        let provider = registry
            .create("echo", &serde_json::json!({ "reply": "{}" }))
            .unwrap();
        assert_eq!(provider.name(), "scripted");
    }

    #[test]
    fn test_unknown_kind_lists_known_ones() {
        let mut registry = ProviderRegistry::new();
        registry.register(echo("echo", None));

        let err = registry.validate("openai", &serde_json::json!({})).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'openai'"));
        assert!(message.contains("known: echo"));

        let empty = ProviderRegistry::new();
        assert!(empty.validate("openai", &serde_json::json!({})).unwrap_err().to_string().contains("known: none"));
    }

    #[test]
    fn test_reregistering_keeps_priority() {
        let mut registry = ProviderRegistry::new();
        registry.register(echo("first", None));
        registry.register(echo("second", Some("x")));
        registry.register(echo("first", Some("y")));

        assert_eq!(registry.kinds(), vec!["first", "second"]);
        assert_eq!(registry.template("first").unwrap()["reply"], "y");
        assert!(registry.supports("second"));
        assert!(!registry.supports("third"));
        assert!(registry.template("third").is_none());
    }

    #[test]
    fn test_first_usable_skips_unconfigured() {
        let mut registry = ProviderRegistry::new();
        registry.register(echo("needs-settings", None));
        registry.register(echo("ready", Some("ok")));

        let (kind, settings) = registry.first_usable().unwrap();
        assert_eq!(kind, "ready");
        assert_eq!(settings["reply"], "ok");

        let mut none_ready = ProviderRegistry::new();
        none_ready.register(echo("needs-settings", None));
        assert!(none_ready.first_usable().is_none());
    }
}
