//! API keys for reasoning backends.
//!
//! A key is wrapped in [`SecretString`] the moment it is read. Formatting an
//! [`ApiKey`] prints its label and origin only; [`ApiKey::expose`] is meant
//! for the request header and nothing else.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Where a key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// The provider's `settings` object
    Settings,
    Environment,
    /// Passed directly in code
    Inline,
}

impl KeyOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyOrigin::Settings => "settings",
            KeyOrigin::Environment => "environment",
            KeyOrigin::Inline => "inline",
        }
    }
}

impl fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ApiKey {
    secret: SecretString,
    origin: KeyOrigin,
    label: &'static str,
}

impl ApiKey {
    pub fn inline(value: impl Into<String>, label: &'static str) -> Self {
        Self::with_origin(value.into(), KeyOrigin::Inline, label)
    }

    fn with_origin(value: String, origin: KeyOrigin, label: &'static str) -> Self {
        Self {
            secret: SecretString::from(value),
            origin,
            label,
        }
    }

    /// Read the key from `var`. A blank variable counts as unset.
    pub fn from_env(var: &str, label: &'static str) -> Result<Self, ProviderError> {
        env_value(var)
            .map(|value| Self::with_origin(value, KeyOrigin::Environment, label))
            .ok_or_else(|| ProviderError::NotConfigured(format!("{} missing: export {}", label, var)))
    }

    /// Take `field` from provider settings, or `var` from the environment.
    ///
    /// Settings win. Blank values on either side count as missing.
    pub fn resolve(
        settings: &JsonValue,
        field: &str,
        var: &str,
        label: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = settings_value(settings, field) {
            return Ok(Self::with_origin(value.to_string(), KeyOrigin::Settings, label));
        }

        Self::from_env(var, label).map_err(|_| {
            ProviderError::NotConfigured(format!(
                "{} missing: set settings.{} or export {}",
                label, field, var
            ))
        })
    }

    /// Whether [`ApiKey::resolve`] would succeed.
    pub fn is_resolvable(settings: &JsonValue, field: &str, var: &str) -> bool {
        settings_value(settings, field).is_some() || env_value(var).is_some()
    }

    /// The raw key, for the request header.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn settings_value<'a>(settings: &'a JsonValue, field: &str) -> Option<&'a str> {
    settings
        .get(field)
        .and_then(JsonValue::as_str)
        .filter(|v| !v.trim().is_empty())
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}, {}, [REDACTED])", self.label, self.origin)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "AIza-test-secret-0001";

    #[test]
    fn test_value_never_formatted() {
        let key = ApiKey::inline(KEY, "Gemini API key");

        let debug = format!("{:?}", key);
        assert!(!debug.contains(KEY));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(key.to_string(), "Gemini API key (inline)");
        assert_eq!(key.expose(), KEY);
    }

    #[test]
    fn test_settings_win_over_environment() {
        std::env::set_var("CLAUSEGUARD_TEST_KEY_PRIORITY", "env-key");
        let settings = serde_json::json!({ "api_key": "settings-key" });

        let key = ApiKey::resolve(&settings, "api_key", "CLAUSEGUARD_TEST_KEY_PRIORITY", "Test key").unwrap();
        assert_eq!(key.expose(), "settings-key");
        assert_eq!(key.origin(), KeyOrigin::Settings);

        std::env::remove_var("CLAUSEGUARD_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_blank_setting_falls_back_to_environment() {
        std::env::set_var("CLAUSEGUARD_TEST_KEY_FALLBACK", "env-key");
        let settings = serde_json::json!({ "api_key": "  " });

        let key = ApiKey::resolve(&settings, "api_key", "CLAUSEGUARD_TEST_KEY_FALLBACK", "Test key").unwrap();
        assert_eq!(key.expose(), "env-key");
        assert_eq!(key.origin(), KeyOrigin::Environment);

        std::env::remove_var("CLAUSEGUARD_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_missing_everywhere() {
        let settings = serde_json::json!({});
        let err = ApiKey::resolve(&settings, "api_key", "CLAUSEGUARD_TEST_KEY_ABSENT", "Test key").unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Test key"));
        assert!(message.contains("settings.api_key"));
        assert!(message.contains("CLAUSEGUARD_TEST_KEY_ABSENT"));
        assert!(!ApiKey::is_resolvable(&settings, "api_key", "CLAUSEGUARD_TEST_KEY_ABSENT"));
    }

    #[test]
    fn test_non_object_settings() {
        let settings = serde_json::json!("not an object");
        assert!(!ApiKey::is_resolvable(&settings, "api_key", "CLAUSEGUARD_TEST_KEY_ABSENT"));
    }
}
