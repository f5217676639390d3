//! Bounded exponential-backoff retry for the non-streaming call path.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::GenError;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retries beyond the first attempt.
    pub max_retries: u32,
    /// Base delay for the exponential backoff term.
    pub base_delay: Duration,
    /// Ceiling applied to every computed delay.
    pub max_delay: Duration,
    /// Backoff multiplier (for exponential backoff).
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays. Off by default so delays are
    /// deterministic; callers sharing a provider across many clients may
    /// want it on.
    pub use_jitter: bool,
    /// Maximum jitter percentage (0.0 to 1.0).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: false,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub const fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Delay before retry number `attempt` (zero-based) after `error`.
    ///
    /// The classification's suggested wait overrides the exponential term;
    /// either way the result is clamped to `max_delay`.
    pub fn delay_for(&self, attempt: u32, error: &GenError) -> Duration {
        let delay = error.retry_after().unwrap_or_else(|| {
            let millis =
                self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
            Duration::from_millis(millis as u64)
        });
        let delay = delay.min(self.max_delay);

        if self.use_jitter {
            self.add_jitter(delay)
        } else {
            delay
        }
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();
        let jitter_range = delay.as_millis() as f64 * self.jitter_factor;
        let jitter = rng.gen_range(-jitter_range..=jitter_range);

        let new_delay = delay.as_millis() as f64 + jitter;
        Duration::from_millis(new_delay.max(0.0) as u64)
    }
}

/// Drives the retry loop around one fallible async operation.
pub(crate) struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `operation`, retrying retryable classified failures up to the
    /// policy bound. Non-retryable and exhausted failures propagate the
    /// last classified error.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, GenError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, GenError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.policy.max_retries {
                        return Err(error);
                    }
                    let delay = self.policy.delay_for(attempt, &error);
                    debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying generation call"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
