//! Error handling for the generation client.
//!
//! Every transport-, HTTP-, and parse-level failure is classified into a
//! [`GenError`] before it crosses the crate boundary. Callers never see raw
//! reqwest or serde errors, only classified errors with a fixed-vocabulary
//! kind, a retryability flag, and (where a provider suggests one) a wait
//! hint.

use std::time::Duration;
use thiserror::Error;

/// Default wait suggested for a rate-limit response that carries no
/// explicit retry-after hint.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Wait suggested for upstream 5xx responses.
const SERVER_ERROR_WAIT: Duration = Duration::from_secs(5);

/// Coarse error classification (fixed vocabulary, provider-agnostic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    Network,
    Timeout,
    InvalidCredential,
    QuotaExceeded,
    ModelNotFound,
    ContextLengthExceeded,
    Server,
    Unknown,
}

/// Classified error for all generation calls.
///
/// Messages are plain-language and suitable for direct display in a
/// settings or editor UI.
#[derive(Debug, Clone, Error)]
pub enum GenError {
    /// 429 without a quota/billing indication. Retryable.
    #[error("{message}")]
    RateLimited {
        message: String,
        /// Provider-suggested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// Connection-level failure (DNS, refused, reset). Retryable.
    #[error("Network error - check your internet connection ({0})")]
    Network(String),

    /// Request or stream exceeded its deadline. Retryable.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// 401/403. Not retryable.
    #[error("Invalid API key - please check your API key in settings")]
    InvalidCredential(String),

    /// 429 with a quota/billing indication. Not retryable.
    #[error("Quota exceeded - check your plan and billing details")]
    QuotaExceeded(String),

    /// 404. Not retryable.
    #[error("Model not found - check the model name in settings")]
    ModelNotFound(String),

    /// 400 mentioning prompt length/tokens/context. Not retryable.
    #[error("Prompt too long for this model - shorten the note or pick a larger-context model")]
    ContextLengthExceeded(String),

    /// 5xx. Retryable with a short wait.
    #[error("Provider server error ({code}): {message}")]
    Server { code: u16, message: String },

    /// Invalid client-side configuration (empty custom endpoint, bad key
    /// bytes). Not retryable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Operation is not available on this platform. Not retryable.
    #[error("{0}")]
    UnsupportedPlatform(String),

    /// Anything we could not classify. Not retryable.
    #[error("{0}")]
    Unknown(String),
}

impl GenError {
    /// Map to the coarse classification vocabulary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::InvalidCredential(_) => ErrorKind::InvalidCredential,
            Self::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
            Self::ModelNotFound(_) => ErrorKind::ModelNotFound,
            Self::ContextLengthExceeded(_) => ErrorKind::ContextLengthExceeded,
            Self::Server { .. } => ErrorKind::Server,
            Self::Configuration(_) | Self::UnsupportedPlatform(_) | Self::Unknown(_) => {
                ErrorKind::Unknown
            }
        }
    }

    /// Whether the retry driver may transparently retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) | Self::Server { .. }
        )
    }

    /// Provider-suggested wait before retrying, when one applies.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            Self::Server { .. } => Some(SERVER_ERROR_WAIT),
            _ => None,
        }
    }

    /// Classify an HTTP failure status plus the provider's error message.
    ///
    /// The message heuristics (quota wording on 429, length wording on 400,
    /// embedded retry-after hints) are best-effort: most provider APIs lack
    /// structured error codes, so free-text sniffing is the only signal
    /// available. The retry-after hint is extracted from the raw provider
    /// message *before* any rewriting.
    pub fn from_status(code: u16, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        match code {
            400 => {
                if lower.contains("context")
                    || lower.contains("token")
                    || lower.contains("length")
                    || lower.contains("too long")
                {
                    Self::ContextLengthExceeded(message.to_string())
                } else {
                    Self::Unknown(format!("Request rejected by provider: {message}"))
                }
            }
            401 | 403 => Self::InvalidCredential(message.to_string()),
            404 => Self::ModelNotFound(message.to_string()),
            429 => {
                if lower.contains("quota") || lower.contains("billing") {
                    Self::QuotaExceeded(message.to_string())
                } else {
                    let retry_after = parse_retry_after_secs(message)
                        .map(Duration::from_secs)
                        .or(Some(DEFAULT_RATE_LIMIT_WAIT));
                    Self::RateLimited {
                        message: "Rate limited - waiting before the next attempt".to_string(),
                        retry_after,
                    }
                }
            }
            c if c >= 500 => Self::Server {
                code,
                message: message.to_string(),
            },
            _ => Self::Unknown(format!("Unexpected provider response ({code}): {message}")),
        }
    }
}

impl From<reqwest::Error> for GenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Network(err.to_string())
        } else {
            Self::Unknown(format!("Unexpected transport failure: {err}"))
        }
    }
}

impl From<serde_json::Error> for GenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unknown(format!("Failed to decode provider response: {err}"))
    }
}

/// Scan a provider error message for an embedded retry hint such as
/// "Please try again in 20s", "retry after 30 seconds", or
/// "try again in 2 minutes".
///
/// The unit may be a suffix on the number ("20s", "500ms", "6m0s") or the
/// following word; without one, seconds are assumed.
fn parse_retry_after_secs(message: &str) -> Option<u64> {
    let lower = message.to_ascii_lowercase();
    let mut words = lower.split_whitespace().peekable();
    while let Some(word) = words.next() {
        if word != "in" && word != "after" {
            continue;
        }
        let Some(next) = words.peek() else {
            continue;
        };
        let digits: String = next.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            continue;
        }
        let value: u64 = digits.parse().ok()?;

        let suffix = next[digits.len()..].trim_matches(|c: char| c == '.' || c == ',');
        let unit = if suffix.is_empty() {
            // Unit may be the word after the number ("30 seconds").
            let mut ahead = words.clone();
            ahead.next();
            ahead.next().unwrap_or("")
        } else {
            suffix
        };

        return Some(match unit {
            u if u.starts_with("ms") || u.starts_with("millisecond") => {
                value.div_ceil(1000).max(1)
            }
            // "2m", "6m0s", "2 minutes"; the fractional tail of compound
            // forms is dropped.
            u if u.starts_with('m') => value * 60,
            _ => value,
        });
    }
    None
}
