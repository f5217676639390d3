//! The generation client: transport, retry wiring, and the public API.

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::GenError;
use crate::parse::{parse_response, parse_stream_line, StreamEvent};
use crate::platform::PlatformCapabilities;
use crate::request::build_request;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::stream::LineBuffer;
use crate::types::{GenerationResponse, Provider, ProviderConfig, StreamFragment};

/// Default hard wall-clock ceiling for one streaming call. Expiry aborts
/// the in-flight request and surfaces as a retryable timeout.
const STREAM_TIMEOUT: Duration = Duration::from_secs(120);

/// Unified client for AI text generation.
///
/// One logical call at a time; the only cross-call state is the current
/// configuration snapshot, which each call clones at start. Swapping the
/// configuration mid-call does not affect the call in flight.
pub struct GenClient {
    http: reqwest::Client,
    config: ProviderConfig,
    policy: RetryPolicy,
    platform: PlatformCapabilities,
    stream_timeout: Duration,
}

impl GenClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            policy: RetryPolicy::default(),
            platform: PlatformCapabilities::detect(),
            stream_timeout: STREAM_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_platform(mut self, platform: PlatformCapabilities) -> Self {
        self.platform = platform;
        self
    }

    /// Override the streaming wall-clock ceiling (default 120s).
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Replace the configuration used by subsequent calls.
    pub fn set_config(&mut self, config: ProviderConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// One buffered prompt/response turn, with transparent retry of
    /// retryable classified failures.
    pub async fn generate(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<GenerationResponse, GenError> {
        let config = self.config.clone();
        self.check_platform(&config)?;

        let executor = RetryExecutor::new(self.policy.clone());
        executor
            .execute(|| self.generate_once(&config, prompt, system))
            .await
    }

    /// One streaming prompt/response turn.
    ///
    /// `on_fragment` receives each text increment in order; `on_done` fires
    /// exactly once after the terminal signal, and no fragment follows it.
    /// Streaming bypasses the retry driver: once a stream starts it runs to
    /// completion or fails outright. On platforms without incremental body
    /// reads the call falls back to one buffered request delivered as a
    /// single fragment.
    pub async fn generate_stream<F, D>(
        &self,
        prompt: &str,
        system: &str,
        mut on_fragment: F,
        on_done: D,
    ) -> Result<(), GenError>
    where
        F: FnMut(StreamFragment),
        D: FnOnce(),
    {
        let config = self.config.clone();
        self.check_platform(&config)?;

        if !self.platform.native_streaming {
            debug!(provider = %config.provider, "no native streaming, falling back to buffered call");
            let response = self.generate_once(&config, prompt, system).await?;
            on_fragment(StreamFragment {
                text: response.text,
                done: false,
            });
            on_done();
            return Ok(());
        }

        match tokio::time::timeout(
            self.stream_timeout,
            self.run_stream(&config, prompt, system, &mut on_fragment),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                // Dropping the stream future aborts the in-flight request.
                warn!(provider = %config.provider, "streaming call hit the wall-clock ceiling");
                return Err(GenError::Timeout(format!(
                    "generation did not finish within {} seconds",
                    self.stream_timeout.as_secs()
                )));
            }
        }

        on_done();
        Ok(())
    }

    /// Connectivity self-test for settings validation: sends one fixed
    /// prompt and checks the reply for the confirmation word.
    pub async fn test_connection(&self) -> Result<bool, GenError> {
        let response = self
            .generate(
                "Reply with the single word OK.",
                "You are a connectivity check. Answer with one word.",
            )
            .await?;
        Ok(response.text.to_ascii_lowercase().contains("ok"))
    }

    fn check_platform(&self, config: &ProviderConfig) -> Result<(), GenError> {
        if config.provider == Provider::Local && !self.platform.local_network {
            return Err(GenError::UnsupportedPlatform(
                "Local models are not available on this platform".to_string(),
            ));
        }
        Ok(())
    }

    async fn generate_once(
        &self,
        config: &ProviderConfig,
        prompt: &str,
        system: &str,
    ) -> Result<GenerationResponse, GenError> {
        let request = build_request(prompt, system, false, config)?;
        debug!(provider = %config.provider, model = %config.model, url = %request.url, "sending generation request");

        let response = self
            .http
            .post(&request.url)
            .headers(request.headers.clone())
            .json(&request.body)
            .send()
            .await
            .map_err(GenError::from)?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            let error = GenError::from_status(status, &message);
            warn!(provider = %config.provider, status, error = %error, "generation request failed");
            return Err(error);
        }

        let body: Value = response.json().await.map_err(GenError::from)?;
        Ok(parse_response(config.provider, &body, &config.model))
    }

    async fn run_stream<F>(
        &self,
        config: &ProviderConfig,
        prompt: &str,
        system: &str,
        on_fragment: &mut F,
    ) -> Result<(), GenError>
    where
        F: FnMut(StreamFragment),
    {
        let request = build_request(prompt, system, true, config)?;
        debug!(provider = %config.provider, model = %config.model, url = %request.url, "starting generation stream");

        let response = self
            .http
            .post(&request.url)
            .headers(request.headers.clone())
            .json(&request.body)
            .send()
            .await
            .map_err(GenError::from)?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            return Err(GenError::from_status(status, &message));
        }

        let mut lines = LineBuffer::new();
        let mut byte_stream = response.bytes_stream();
        let mut terminated = false;

        'read: while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk.map_err(GenError::from)?;
            for line in lines.push(&chunk) {
                match parse_stream_line(config.provider, &line) {
                    Some(StreamEvent::Delta(text)) => on_fragment(StreamFragment {
                        text,
                        done: false,
                    }),
                    Some(StreamEvent::Done) => {
                        // Nothing buffered after the terminal signal may
                        // produce fragments.
                        terminated = true;
                        break 'read;
                    }
                    None => {}
                }
            }
        }

        if !terminated {
            // A body that does not end in a newline still owes us its last
            // line.
            if let Some(rest) = lines.finish() {
                if let Some(StreamEvent::Delta(text)) =
                    parse_stream_line(config.provider, &rest)
                {
                    on_fragment(StreamFragment { text, done: false });
                }
            }
        }

        debug!(provider = %config.provider, "generation stream finished");
        Ok(())
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// The three envelope shapes we see: `{"error":{"message":...}}` (OpenAI,
/// Anthropic), `{"error":"..."}` (local server), `{"message":"..."}`. Raw
/// text passes through unchanged.
fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = value["error"]["message"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = value["error"].as_str() {
            return msg.to_string();
        }
        if let Some(msg) = value["message"].as_str() {
            return msg.to_string();
        }
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_extraction_covers_known_envelopes() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad key"}}"#),
            "bad key"
        );
        assert_eq!(
            extract_error_message(r#"{"error":"model not loaded"}"#),
            "model not loaded"
        );
        assert_eq!(
            extract_error_message(r#"{"message":"slow down"}"#),
            "slow down"
        );
        assert_eq!(extract_error_message("plain text"), "plain text");
        assert_eq!(extract_error_message(""), "");
    }
}
