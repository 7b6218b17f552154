use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ScrapeError;

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 { 3 }
fn default_initial_delay_ms() -> u64 { 1_000 }
fn default_max_delay_ms() -> u64 { 30_000 }
fn default_multiplier() -> f64 { 2.0 }

/// Run `f` up to `config.max_attempts` times with jittered exponential
/// backoff between attempts. Non-retryable errors fail immediately;
/// cancellation interrupts both attempts-in-waiting and backoff sleeps.
pub async fn with_retry<T, F, Fut>(
    token: &CancellationToken,
    config: &RetryConfig,
    operation: &str,
    mut f: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay();
    let mut last_err: Option<ScrapeError> = None;

    for attempt in 1..=max_attempts {
        if token.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }

        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
            Err(e) if !e.is_retryable() => {
                warn!(operation, attempt, error = %e, "non-retryable failure");
                return Err(e);
            }
            Err(e) => {
                warn!(operation, attempt, max_attempts, error = %e, "attempt failed");
                last_err = Some(e);
            }
        }

        if attempt < max_attempts {
            let sleep_for = delay.min(config.max_delay()) + jitter(delay);
            debug!(operation, attempt, sleep_ms = sleep_for.as_millis() as u64, "backing off");
            tokio::select! {
                _ = token.cancelled() => return Err(ScrapeError::Cancelled),
                _ = tokio::time::sleep(sleep_for) => {}
            }
            delay = scale_delay(delay, config.multiplier, config.max_delay());
        }
    }

    Err(ScrapeError::Exhausted {
        attempts: max_attempts,
        source: Box::new(last_err.unwrap_or(ScrapeError::NoDataFound)),
    })
}

/// Uniform jitter in `[0, delay/4)`.
fn jitter(delay: Duration) -> Duration {
    let cap = delay.as_millis() as u64 / 4;
    if cap == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..cap))
}

fn scale_delay(delay: Duration, multiplier: f64, max_delay: Duration) -> Duration {
    let scaled = Duration::from_secs_f64(delay.as_secs_f64() * multiplier);
    scaled.min(max_delay)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 10,
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retryable_error_exhausts_all_attempts() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = with_retry(&token, &fast_config(3), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ScrapeError::NetworkTimeout("refused".into()))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(ScrapeError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, ScrapeError::NetworkTimeout(_)));
            }
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry(&token, &fast_config(3), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ScrapeError::NoDataFound)
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_on_first_attempt() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = with_retry(&token, &fast_config(5), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ScrapeError::ParsingFailed("broken table".into()))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScrapeError::ParsingFailed(_))));
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let token = CancellationToken::new();
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 60_000,
            max_delay_ms: 60_000,
            multiplier: 1.0,
        };

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let started = std::time::Instant::now();
        let result: Result<(), _> = with_retry(&token, &config, "test", || async {
            Err(ScrapeError::NetworkTimeout("down".into()))
        })
        .await;

        assert!(matches!(result, Err(ScrapeError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let token = CancellationToken::new();
        token.cancel();

        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let result: Result<(), _> = with_retry(&token, &fast_config(3), "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(matches!(result, Err(ScrapeError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
