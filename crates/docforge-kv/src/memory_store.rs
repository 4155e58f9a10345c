//! In-process `KvStore` for tests and for running without a Redis instance.
//! Not wired behind a cargo feature — it is a legitimate standalone backend,
//! just one whose state does not survive process restart or span instances.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::KvResult;
use crate::store::KvStore;

struct StringEntry {
    value: String,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    zsets: HashMap<String, Vec<(String, i64)>>,
    strings: HashMap<String, StringEntry>,
}

/// In-memory `KvStore`. Every key behaves like a standalone Redis instance:
/// TTLs are wall-clock, sorted sets are plain `(member, score)` vectors.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn zadd(&self, key: &str, score: i64, member: &str) -> KvResult<()> {
        let mut state = self.state.lock().await;
        let set = state.zsets.entry(key.to_string()).or_default();
        set.retain(|(m, _)| m != member);
        set.push((member.to_string(), score));
        Ok(())
    }

    async fn zremrangebyscore(&self, key: &str, min: i64, max: i64) -> KvResult<()> {
        let mut state = self.state.lock().await;
        if let Some(set) = state.zsets.get_mut(key) {
            set.retain(|(_, score)| *score < min || *score > max);
        }
        Ok(())
    }

    async fn zcard(&self, key: &str) -> KvResult<i64> {
        let state = self.state.lock().await;
        Ok(state.zsets.get(key).map(|s| s.len() as i64).unwrap_or(0))
    }

    async fn zmin_score(&self, key: &str) -> KvResult<Option<i64>> {
        let state = self.state.lock().await;
        Ok(state.zsets.get(key).and_then(|s| s.iter().map(|(_, score)| *score).min()))
    }

    async fn expire(&self, key: &str, ttl_seconds: i64) -> KvResult<()> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        state.strings.entry(key.to_string()).and_modify(|e| {
            e.expires_at = Some(Instant::now() + Duration::from_secs(ttl_seconds as u64));
        });
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> KvResult<()> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        state.strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds as u64)),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut state = self.state.lock().await;
        let expired = state
            .strings
            .get(key)
            .map(|e| e.expires_at.is_some_and(|t| t <= Instant::now()))
            .unwrap_or(false);
        if expired {
            state.strings.remove(key);
        }
        Ok(state.strings.contains_key(key))
    }

    async fn del(&self, key: &str) -> KvResult<()> {
        let mut state = self.state.lock().await;
        state.strings.remove(key);
        state.zsets.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zadd_and_zcard_track_membership() {
        let store = MemoryStore::new();
        store.zadd("k", 1, "a").await.unwrap();
        store.zadd("k", 2, "b").await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn zremrangebyscore_evicts_out_of_window_members() {
        let store = MemoryStore::new();
        store.zadd("k", 10, "old").await.unwrap();
        store.zadd("k", 100, "new").await.unwrap();
        store.zremrangebyscore("k", i64::MIN, 50).await.unwrap();
        assert_eq!(store.zcard("k").await.unwrap(), 1);
        assert_eq!(store.zmin_score("k").await.unwrap(), Some(100));
    }

    #[tokio::test]
    async fn set_ex_with_zero_ttl_is_a_no_op() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 0).await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn set_ex_then_exists_reports_true() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert!(store.exists("k").await.unwrap());
    }
}
