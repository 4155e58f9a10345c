//! Sliding-window rate limiting over a sorted set keyed by
//! `client_identifier × endpoint`, with the score being an integer second
//! timestamp. The limiter owns no in-process state: every call round-trips
//! to the `KvStore`, so instances can be scaled out without coordination.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::store::KvStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current: i64,
    pub remaining: i64,
    pub reset_at: i64,
    /// Set only on fail-open: the adapter errored and the request was let through.
    pub error: Option<String>,
}

pub struct RateLimiter<S: KvStore> {
    store: Arc<S>,
}

impl<S: KvStore> RateLimiter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// `check(key, limit, window_seconds)`. Fails open: any adapter error
    /// returns `allowed=true` with `error` set, never blocks the request.
    pub async fn check(&self, key: &str, limit: i64, window_seconds: i64) -> RateLimitDecision {
        let now = now_seconds();
        match self.check_inner(key, limit, window_seconds, now).await {
            Ok(decision) => decision,
            Err(e) => RateLimitDecision {
                allowed: true,
                current: 0,
                remaining: limit,
                reset_at: now + window_seconds,
                error: Some(e.to_string()),
            },
        }
    }

    async fn check_inner(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
        now: i64,
    ) -> crate::error::KvResult<RateLimitDecision> {
        self.store.zremrangebyscore(key, i64::MIN, now - window_seconds).await?;
        let current = self.store.zcard(key).await?;

        if current >= limit {
            let oldest = self.store.zmin_score(key).await?.unwrap_or(now);
            return Ok(RateLimitDecision {
                allowed: false,
                current,
                remaining: 0,
                reset_at: oldest + window_seconds,
                error: None,
            });
        }

        let member = Uuid::new_v4().to_string();
        self.store.zadd(key, now, &member).await?;
        self.store.expire(key, window_seconds).await?;

        let current = current + 1;
        Ok(RateLimitDecision {
            allowed: true,
            current,
            remaining: (limit - current).max(0),
            reset_at: now + window_seconds,
            error: None,
        })
    }
}

fn now_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;

    #[tokio::test]
    async fn allows_requests_up_to_the_limit_then_denies() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()));
        for i in 1..=5 {
            let decision = limiter.check("client:endpoint", 5, 60).await;
            assert!(decision.allowed, "request {i} should be allowed");
            assert_eq!(decision.current, i);
        }
        let sixth = limiter.check("client:endpoint", 5, 60).await;
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
    }

    #[tokio::test]
    async fn denied_response_reports_remaining_zero_and_future_reset() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()));
        for _ in 0..3 {
            limiter.check("k", 3, 60).await;
        }
        let decision = limiter.check("k", 3, 60).await;
        assert!(!decision.allowed);
        assert!(decision.reset_at > now_seconds());
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()));
        for _ in 0..3 {
            limiter.check("a", 3, 60).await;
        }
        let other = limiter.check("b", 3, 60).await;
        assert!(other.allowed);
    }
}
