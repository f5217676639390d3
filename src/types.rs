//! Core data types shared across the client.

use secrecy::SecretString;
use serde::Deserialize;

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat-completion API.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Locally hosted model server (Ollama-style).
    Local,
    /// Arbitrary OpenAI-compatible endpoint.
    Custom,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Local => "local",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration snapshot for one generation call.
///
/// Supplied by the caller's settings store and replaceable between calls;
/// an in-flight call keeps the clone it captured at start.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    /// API key. Optional for the local server; `custom` endpoints without
    /// one get no Authorization header at all.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Endpoint override. Required for `custom`, optional elsewhere.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl ProviderConfig {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            endpoint: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Token usage as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Normalized result of one non-streaming generation call.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// Generated text; empty when the provider returned no content.
    pub text: String,
    /// Model that produced the response (provider-reported when present).
    pub model: String,
    /// Present only if the provider reports token counts.
    pub usage: Option<Usage>,
}

/// One increment of generated text delivered during streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment {
    pub text: String,
    /// True only on a terminal fragment. The client signals completion via
    /// the completion callback instead, so fragments it delivers always
    /// carry `false`.
    pub done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_deserializes_lowercase() {
        let p: Provider = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(p, Provider::Anthropic);
        let p: Provider = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(p, Provider::OpenAi);
    }

    #[test]
    fn config_defaults_apply_on_deserialize() {
        let cfg: ProviderConfig =
            serde_json::from_str(r#"{"provider":"local","model":"llama3"}"#).unwrap();
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.max_tokens, 2048);
        assert!(cfg.api_key.is_none());
        assert!(cfg.endpoint.is_none());
    }

    #[test]
    fn builder_setters() {
        let cfg = ProviderConfig::new(Provider::Custom, "my-model")
            .with_endpoint("http://example.invalid/v1/chat/completions")
            .with_temperature(0.2)
            .with_max_tokens(512);
        assert_eq!(cfg.provider, Provider::Custom);
        assert_eq!(cfg.temperature, 0.2);
        assert_eq!(cfg.max_tokens, 512);
        assert!(cfg.endpoint.is_some());
    }
}
