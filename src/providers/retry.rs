//! Retry configuration, delay calculation, and the retrying source decorator.
//!
//! Retries are opt-in: the selection policy itself never retries, it only
//! sees what its source returns. Wrapping a source in [`RetryingSource`]
//! moves retry handling below the policy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::random::{self, RandomSource};
use crate::telemetry;
use crate::types::Quote;
use crate::{MimirError, Result};

use super::traits::QuoteSource;

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use mimir::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    #[serde(with = "millis")]
    pub max_delay: Duration,
    /// Whether to add up to 50% random jitter to delays. Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Reject settings that would never call the source.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(MimirError::Configuration(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    /// Does NOT include jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting source `retry_after` hints.
    ///
    /// If a `retry_after` duration is provided (from a `RateLimited` error),
    /// it takes precedence over the calculated backoff and is never jittered.
    pub fn effective_delay(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        random: &dyn RandomSource,
    ) -> Duration {
        if let Some(hint) = retry_after {
            return hint;
        }
        let base = self.delay_for_attempt(attempt);
        if !self.jitter {
            return base;
        }
        let spread = base.as_millis() as u64 / 2;
        base + Duration::from_millis(random.next(0, spread + 1))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

// ============================================================================
// Shared retry helper
// ============================================================================

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`MimirError::is_transient()`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `RateLimited` errors.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    random: &dyn RandomSource,
    source_name: &str,
    operation: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    // Zero attempts would never reach the source; run it once.
    let max_attempts = config.max_attempts.max(1);
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "source" => source_name.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after(), random);
                    warn!(
                        source = source_name,
                        operation,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or(MimirError::NoSource))
}

// ============================================================================
// RetryingSource
// ============================================================================

/// Decorator that wraps a [`QuoteSource`] with retry logic.
///
/// On transient errors retries with exponential backoff up to
/// `config.max_attempts`. Permanent errors, including everything raised by
/// the cache and selectors, are returned immediately.
pub struct RetryingSource<Q: Quote> {
    inner: Arc<dyn QuoteSource<Q>>,
    config: RetryConfig,
    random: Arc<dyn RandomSource>,
}

impl<Q: Quote> RetryingSource<Q> {
    /// Wrap a source with retry logic.
    pub fn new(inner: Arc<dyn QuoteSource<Q>>, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            random: random::default_source(),
        }
    }

    /// Replace the generator used for jitter.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl<Q: Quote> QuoteSource<Q> for RetryingSource<Q> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn download_one(&self, tag: Option<&str>) -> Result<Q> {
        with_retry(
            &self.config,
            self.random.as_ref(),
            self.inner.name(),
            "download_one",
            || self.inner.download_one(tag),
        )
        .await
    }

    async fn download_many(&self, tag: Option<&str>) -> Result<Vec<Q>> {
        with_retry(
            &self.config,
            self.random.as_ref(),
            self.inner.name(),
            "download_many",
            || self.inner.download_many(tag),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(350));
    }

    #[test]
    fn retry_after_hint_wins() {
        let config = RetryConfig::new();
        let rng = SequenceRandom::new([0]);
        let hint = Some(Duration::from_secs(7));
        assert_eq!(config.effective_delay(3, hint, &rng), Duration::from_secs(7));
    }

    #[test]
    fn jitter_adds_at_most_half() {
        let config = RetryConfig::new().initial_delay(Duration::from_millis(100));
        let rng = SequenceRandom::new([0, 50, 1_000]);
        assert_eq!(config.effective_delay(0, None, &rng), Duration::from_millis(100));
        assert_eq!(config.effective_delay(0, None, &rng), Duration::from_millis(150));
        assert_eq!(config.effective_delay(0, None, &rng), Duration::from_millis(150));

        let flat = config.jitter(false);
        assert_eq!(flat.effective_delay(0, None, &rng), Duration::from_millis(100));
    }

    #[test]
    fn zero_attempts_fail_validation() {
        let err = RetryConfig::new().max_attempts(0).validate().unwrap_err();
        assert!(matches!(err, MimirError::Configuration(_)));
        assert!(RetryConfig::disabled().validate().is_ok());
    }

    #[test]
    fn deserializes_millis() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 4, "initial_delay": 20}"#).unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.initial_delay, Duration::from_millis(20));
        assert_eq!(config.max_delay, Duration::from_secs(30));
    }
}
