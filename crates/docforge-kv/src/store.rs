//! Minimal sorted-set + string KV surface. The rate limiter and blacklist
//! are both built only on these primitives, so any backend that can offer
//! them (Redis in production, an in-process map in tests) is a drop-in.

use async_trait::async_trait;

use crate::error::KvResult;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Adds `member` to the sorted set at `key` with the given score.
    async fn zadd(&self, key: &str, score: i64, member: &str) -> KvResult<()>;

    /// Removes members scored in `[min, max]` (inclusive).
    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> KvResult<()>;

    /// Number of members currently in the sorted set.
    async fn zcard(&self, key: &str) -> KvResult<i64>;

    /// Score of the lowest-scored member, if the set is non-empty.
    async fn zmin_score(&self, key: &str) -> KvResult<Option<i64>>;

    /// Sets (or refreshes) a TTL on `key`, in whole seconds.
    async fn expire(&self, key: &str, ttl_seconds: i64) -> KvResult<()>;

    /// Writes a string value with a TTL. A `ttl_seconds` of 0 is a no-op write skip.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> KvResult<()>;

    /// Whether `key` currently exists (and has not expired).
    async fn exists(&self, key: &str) -> KvResult<bool>;

    /// Deletes `key` unconditionally. Used by tests and by explicit resets.
    async fn del(&self, key: &str) -> KvResult<()>;
}
