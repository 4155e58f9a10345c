//! Runtime-selected `KvStore`: Redis when configured, an in-process map
//! otherwise. A plain enum rather than `Arc<dyn KvStore>` since `RateLimiter`
//! and `TokenBlacklist` are generic over a `Sized` backend.

use async_trait::async_trait;

use crate::error::KvResult;
use crate::memory_store::MemoryStore;
use crate::redis_store::RedisStore;
use crate::store::KvStore;

pub enum KvBackend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

#[async_trait]
impl KvStore for KvBackend {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> KvResult<()> {
        match self {
            KvBackend::Redis(s) => s.zadd(key, score, member).await,
            KvBackend::Memory(s) => s.zadd(key, score, member).await,
        }
    }

    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> KvResult<()> {
        match self {
            KvBackend::Redis(s) => s.zremrangebyscore(key, min, max).await,
            KvBackend::Memory(s) => s.zremrangebyscore(key, min, max).await,
        }
    }

    async fn zcard(&self, key: &str) -> KvResult<i64> {
        match self {
            KvBackend::Redis(s) => s.zcard(key).await,
            KvBackend::Memory(s) => s.zcard(key).await,
        }
    }

    async fn zmin_score(&self, key: &str) -> KvResult<Option<i64>> {
        match self {
            KvBackend::Redis(s) => s.zmin_score(key).await,
            KvBackend::Memory(s) => s.zmin_score(key).await,
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> KvResult<()> {
        match self {
            KvBackend::Redis(s) => s.expire(key, ttl_seconds).await,
            KvBackend::Memory(s) => s.expire(key, ttl_seconds).await,
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> KvResult<()> {
        match self {
            KvBackend::Redis(s) => s.set_ex(key, value, ttl_seconds).await,
            KvBackend::Memory(s) => s.set_ex(key, value, ttl_seconds).await,
        }
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        match self {
            KvBackend::Redis(s) => s.exists(key).await,
            KvBackend::Memory(s) => s.exists(key).await,
        }
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        match self {
            KvBackend::Redis(s) => s.del(key).await,
            KvBackend::Memory(s) => s.del(key).await,
        }
    }
}
