//! Bounded exponential-backoff retry: 3 attempts, base 1s, capped at 16s.
//! Only retryable errors burn an attempt; anything else returns immediately.

use std::future::Future;
use std::time::Duration;

pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(16);

/// Lets `with_retry` tell a transient failure (worth another attempt) apart
/// from one that will never succeed no matter how many times it's retried.
pub trait RetryClassify {
    fn is_retryable(&self) -> bool;
}

pub fn backoff_delay(attempt: u32) -> Duration {
    let scaled = BASE_DELAY.saturating_mul(1u32 << attempt.min(8));
    scaled.min(MAX_DELAY)
}

/// Runs `op` up to `MAX_ATTEMPTS` times, sleeping the backoff delay between
/// attempts. Stops early, without sleeping, the moment an error reports
/// itself as non-retryable. The last error is returned verbatim once
/// attempts are exhausted or a non-retryable error is hit.
pub async fn with_retry<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !err.is_retryable() || attempt >= MAX_ATTEMPTS {
                    return Err(err);
                }
                tokio::time::sleep(backoff_delay(attempt - 1)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq, Eq)]
    struct AlwaysRetry(&'static str);

    impl RetryClassify for AlwaysRetry {
        fn is_retryable(&self) -> bool {
            true
        }
    }

    #[derive(Debug, PartialEq, Eq)]
    struct NeverRetry(&'static str);

    impl RetryClassify for NeverRetry {
        fn is_retryable(&self) -> bool {
            false
        }
    }

    #[test]
    fn backoff_delay_doubles_until_cap() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(10), MAX_DELAY);
    }

    #[tokio::test]
    async fn with_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), AlwaysRetry> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AlwaysRetry("boom")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn with_retry_returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(AlwaysRetry("not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_stops_immediately_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), NeverRetry> = with_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(NeverRetry("bad request")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
