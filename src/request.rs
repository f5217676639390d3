//! Request building: one provider-specific wire request per call.
//!
//! Pure shaping only; nothing here touches the network.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde_json::json;

use crate::error::GenError;
use crate::types::{Provider, ProviderConfig};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const LOCAL_DEFAULT_BASE: &str = "http://localhost:11434";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A fully shaped HTTP request, ready for the transport.
#[derive(Debug, Clone)]
pub(crate) struct WireRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Build the wire request for `(prompt, system, stream)` under `config`.
pub(crate) fn build_request(
    prompt: &str,
    system: &str,
    stream: bool,
    config: &ProviderConfig,
) -> Result<WireRequest, GenError> {
    let url = endpoint_url(config)?;
    let headers = build_headers(config)?;
    let body = build_body(prompt, system, stream, config);
    Ok(WireRequest { url, headers, body })
}

fn endpoint_url(config: &ProviderConfig) -> Result<String, GenError> {
    let endpoint = config.endpoint.as_deref().filter(|e| !e.is_empty());
    match config.provider {
        Provider::OpenAi => Ok(endpoint.unwrap_or(OPENAI_CHAT_URL).to_string()),
        Provider::Anthropic => Ok(endpoint.unwrap_or(ANTHROPIC_MESSAGES_URL).to_string()),
        Provider::Local => {
            let base = endpoint.unwrap_or(LOCAL_DEFAULT_BASE);
            Ok(format!("{}/api/chat", base.trim_end_matches('/')))
        }
        Provider::Custom => endpoint.map(str::to_string).ok_or_else(|| {
            GenError::Configuration(
                "Custom provider needs an endpoint URL - set one in settings".to_string(),
            )
        }),
    }
}

fn build_headers(config: &ProviderConfig) -> Result<HeaderMap, GenError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    match config.provider {
        Provider::OpenAi | Provider::Custom => {
            // Bearer auth only when a key is configured; never send an
            // empty credential.
            if let Some(key) = &config.api_key {
                headers.insert(
                    AUTHORIZATION,
                    header_value(&format!("Bearer {}", key.expose_secret()))?,
                );
            }
        }
        Provider::Anthropic => {
            if let Some(key) = &config.api_key {
                headers.insert(header_name("x-api-key")?, header_value(key.expose_secret())?);
            }
            headers.insert(
                header_name("anthropic-version")?,
                HeaderValue::from_static(ANTHROPIC_VERSION),
            );
        }
        // The local server takes no credentials.
        Provider::Local => {}
    }

    Ok(headers)
}

fn build_body(prompt: &str, system: &str, stream: bool, config: &ProviderConfig) -> serde_json::Value {
    match config.provider {
        Provider::OpenAi | Provider::Custom => json!({
            "model": config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "stream": stream,
        }),
        Provider::Anthropic => json!({
            "model": config.model,
            "system": system,
            "messages": [
                { "role": "user", "content": prompt },
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "stream": stream,
        }),
        Provider::Local => json!({
            "model": config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "stream": stream,
            "options": {
                "temperature": config.temperature,
                "num_predict": config.max_tokens,
            },
        }),
    }
}

fn header_name(name: &str) -> Result<HeaderName, GenError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| GenError::Configuration(format!("Invalid header name '{name}': {e}")))
}

fn header_value(value: &str) -> Result<HeaderValue, GenError> {
    HeaderValue::from_str(value)
        .map_err(|e| GenError::Configuration(format!("Invalid header value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderConfig;

    fn config(provider: Provider) -> ProviderConfig {
        ProviderConfig::new(provider, "test-model")
            .with_temperature(0.5)
            .with_max_tokens(256)
    }

    #[test]
    fn openai_request_shape() {
        let cfg = config(Provider::OpenAi).with_api_key("sk-test");
        let req = build_request("hello", "be brief", false, &cfg).unwrap();

        assert_eq!(req.url, OPENAI_CHAT_URL);
        assert_eq!(req.headers.get(AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert_eq!(req.body["model"], "test-model");
        assert_eq!(req.body["messages"][0]["role"], "system");
        assert_eq!(req.body["messages"][1]["role"], "user");
        assert_eq!(req.body["messages"][1]["content"], "hello");
        assert_eq!(req.body["max_tokens"], 256);
        assert_eq!(req.body["stream"], false);
    }

    #[test]
    fn anthropic_uses_top_level_system_and_own_headers() {
        let cfg = config(Provider::Anthropic).with_api_key("sk-ant");
        let req = build_request("hello", "be brief", true, &cfg).unwrap();

        assert_eq!(req.url, ANTHROPIC_MESSAGES_URL);
        assert_eq!(req.headers.get("x-api-key").unwrap(), "sk-ant");
        assert_eq!(req.headers.get("anthropic-version").unwrap(), "2023-06-01");
        assert!(req.headers.get(AUTHORIZATION).is_none());
        assert_eq!(req.body["system"], "be brief");
        assert_eq!(req.body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(req.body["messages"][0]["role"], "user");
        assert_eq!(req.body["stream"], true);
    }

    #[test]
    fn local_nests_sampling_params_and_sends_no_credentials() {
        let cfg = config(Provider::Local);
        let req = build_request("hello", "be brief", false, &cfg).unwrap();

        assert_eq!(req.url, "http://localhost:11434/api/chat");
        assert!(req.headers.get(AUTHORIZATION).is_none());
        assert!(req.headers.get("x-api-key").is_none());
        assert_eq!(req.body["options"]["temperature"], 0.5);
        assert_eq!(req.body["options"]["num_predict"], 256);
        assert!(req.body.get("temperature").is_none());
        assert!(req.body.get("max_tokens").is_none());
    }

    #[test]
    fn local_endpoint_override_trims_trailing_slash() {
        let cfg = config(Provider::Local).with_endpoint("http://10.0.0.5:11434/");
        let req = build_request("x", "y", false, &cfg).unwrap();
        assert_eq!(req.url, "http://10.0.0.5:11434/api/chat");
    }

    #[test]
    fn custom_without_key_omits_authorization_entirely() {
        let cfg = config(Provider::Custom).with_endpoint("http://example.invalid/v1/chat/completions");
        let req = build_request("x", "y", false, &cfg).unwrap();
        assert!(req.headers.get(AUTHORIZATION).is_none());
        // Same chat-completion body as OpenAI.
        assert_eq!(req.body["messages"][0]["role"], "system");
    }

    #[test]
    fn custom_requires_endpoint() {
        let cfg = config(Provider::Custom);
        let err = build_request("x", "y", false, &cfg).unwrap_err();
        assert!(matches!(err, GenError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_custom_endpoint_is_rejected() {
        let cfg = config(Provider::Custom).with_endpoint("");
        assert!(build_request("x", "y", false, &cfg).is_err());
    }
}
