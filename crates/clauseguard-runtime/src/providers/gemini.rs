//! Google Gemini provider (Generative Language API, `generateContent`).
//!
//! ## Security
//!
//! The key is held in an [`ApiKey`] and sent only in the
//! `x-goog-api-key` header, never in the URL.

use super::{
    factory::ProviderFactory,
    normalize_model,
    secrets::ApiKey,
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, Role, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const KEY_LABEL: &str = "Gemini API key";

pub struct GeminiProvider {
    api_key: ApiKey,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &self.api_key)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_key(ApiKey::inline(api_key, KEY_LABEL))
    }

    /// Read the key from `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self::with_key(ApiKey::from_env(GOOGLE_API_KEY_ENV, KEY_LABEL)?))
    }

    /// Build from settings: `api_key` (falls back to `GOOGLE_API_KEY`) and
    /// optional `base_url`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let api_key = ApiKey::resolve(config, "api_key", GOOGLE_API_KEY_ENV, KEY_LABEL)?;

        let mut provider = Self::with_key(api_key);
        if let Some(url) = config["base_url"].as_str() {
            provider = provider.with_base_url(url);
        }
        Ok(provider)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn with_key(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            normalize_model(model)
        )
    }
}

/// generateContent request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn text_content(role: Option<&str>, text: String) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part { text: Some(text) }],
    }
}

fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> GenerateRequest {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system.push(msg.content),
            Role::Assistant => contents.push(text_content(Some("model"), msg.content)),
            Role::User => contents.push(text_content(Some("user"), msg.content)),
        }
    }

    GenerateRequest {
        system_instruction: (!system.is_empty()).then(|| text_content(None, system.join("\n\n"))),
        contents,
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        },
    }
}

fn into_completion(body: GenerateResponse, requested: &str) -> Result<CompletionResponse, ProviderError> {
    let candidate = body
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ParseError("response has no candidates".to_string()))?;

    let content = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ProviderError::ParseError(format!(
            "empty candidate (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let usage = body.usage_metadata.unwrap_or_default();

    Ok(CompletionResponse {
        content,
        usage: TokenUsage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
        },
        model: body
            .model_version
            .unwrap_or_else(|| normalize_model(requested).to_string()),
        finish_reason: candidate.finish_reason,
    })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(messages, config);

        let response = self
            .client
            .post(self.endpoint(&config.model))
            .header("x-goog-api-key", self.api_key.expose())
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let raw = response
                .text()
                .await
                .map_err(|e| ProviderError::HttpError(e.to_string()))?;
            let message = match serde_json::from_str::<GeminiError>(&raw) {
                Ok(body) => match body.error.status {
                    Some(s) => format!("{}: {}", s, body.error.message),
                    None => body.error.message,
                },
                Err(_) => raw,
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        into_completion(body, &config.model)
    }

    async fn health_check(&self) -> bool {
        !self.api_key.is_blank()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Factory for [`GeminiProvider`].
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "AIza...",      // Optional, falls back to GOOGLE_API_KEY
///   "base_url": "https://..."  // Optional, custom endpoint
/// }
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn kind(&self) -> &'static str {
        "gemini"
    }

    fn check(&self, settings: &JsonValue) -> Result<(), ProviderError> {
        if !ApiKey::is_resolvable(settings, "api_key", GOOGLE_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "{} missing: set settings.api_key or export {}",
                KEY_LABEL, GOOGLE_API_KEY_ENV
            )));
        }

        match settings.get("base_url").and_then(JsonValue::as_str) {
            Some(url) if !(url.starts_with("https://") || url.starts_with("http://")) => Err(
                ProviderError::NotConfigured(format!("base_url is not an http(s) URL: {}", url)),
            ),
            _ => Ok(()),
        }
    }

    fn build(&self, settings: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(GeminiProvider::from_config(settings)?))
    }

    fn template(&self) -> JsonValue {
        serde_json::json!({ "base_url": DEFAULT_BASE_URL })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_models_prefix() {
        let provider = GeminiProvider::new("key").with_base_url("https://example.test/v1beta/");
        assert_eq!(
            provider.endpoint("models/gemini-2.0-flash"),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_shape() {
        let config = CompletionConfig {
            max_tokens: 256,
            ..Default::default()
        };
        let request = build_request(
            vec![
                ChatMessage::system("You audit contracts."),
                ChatMessage::user("Clause text"),
                ChatMessage::assistant("{}"),
            ],
            &config,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You audit contracts.");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 256);
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_response_parsing() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"risk_score\":" }, { "text": " 4}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 210, "candidatesTokenCount": 40, "totalTokenCount": 250 },
            "modelVersion": "gemini-2.0-flash-001"
        }))
        .unwrap();

        let completion = into_completion(body, "gemini-2.0-flash").unwrap();
        assert_eq!(completion.content, "{\"risk_score\": 4}");
        assert_eq!(completion.usage.total(), 250);
        assert_eq!(completion.model, "gemini-2.0-flash-001");
        assert_eq!(completion.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_blocked_response_is_parse_error() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = into_completion(body, "gemini-pro").unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let empty: GenerateResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(into_completion(empty, "gemini-pro"), Err(ProviderError::ParseError(_))));
    }

    #[test]
    fn test_factory_validation() {
        let factory = GeminiProviderFactory;
        assert_eq!(factory.kind(), "gemini");

        let bad_url = serde_json::json!({ "api_key": "k", "base_url": "ftp://nope" });
        assert!(factory.check(&bad_url).unwrap_err().to_string().contains("ftp://nope"));

        let ok = serde_json::json!({ "api_key": "k" });
        factory.check(&ok).unwrap();
        let provider = factory.build(&ok).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret = "AIza-super-secret-key-12345";
        let provider = GeminiProvider::new(secret);
        let debug = format!("{:?}", provider);
        assert!(!debug.contains(secret));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_reflects_key() {
        assert!(GeminiProvider::new("key").health_check().await);
        assert!(!GeminiProvider::new("").health_check().await);
    }
}
