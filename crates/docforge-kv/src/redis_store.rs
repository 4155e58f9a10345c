use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{KvError, KvResult};
use crate::store::KvStore;

/// Redis-backed `KvStore`, used in production. Holds a `ConnectionManager`,
/// which reconnects transparently and is cheap to clone.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> KvResult<Self> {
        let client = redis::Client::open(url).map_err(|e| KvError::Connection(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| KvError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> KvResult<()> {
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(key, member, score)
            .await
            .map_err(|e| KvError::Command(e.to_string()))
    }

    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> KvResult<()> {
        let mut conn = self.conn.clone();
        conn.zrembyscore::<_, _, _, ()>(key, min, max)
            .await
            .map_err(|e| KvError::Command(e.to_string()))
    }

    async fn zcard(&self, key: &str) -> KvResult<i64> {
        let mut conn = self.conn.clone();
        conn.zcard(key).await.map_err(|e| KvError::Command(e.to_string()))
    }

    async fn zmin_score(&self, key: &str) -> KvResult<Option<i64>> {
        let mut conn = self.conn.clone();
        let rows: Vec<(String, i64)> = conn
            .zrangebyscore_withscores(key, "-inf", "+inf")
            .await
            .map_err(|e| KvError::Command(e.to_string()))?;
        Ok(rows.into_iter().next().map(|(_, score)| score))
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> KvResult<()> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.expire::<_, ()>(key, ttl_seconds)
            .await
            .map_err(|e| KvError::Command(e.to_string()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> KvResult<()> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds as u64)
            .await
            .map_err(|e| KvError::Command(e.to_string()))
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(|e| KvError::Command(e.to_string()))
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(|e| KvError::Command(e.to_string()))
    }
}
