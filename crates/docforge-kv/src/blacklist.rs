//! Tenant-scoped JWT invalidation. Fails closed: any adapter error while
//! checking is treated as "blacklisted" rather than letting a token through.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use docforge_core::tenant::Claims;
use uuid::Uuid;

use crate::store::KvStore;

pub struct TokenBlacklist<S: KvStore> {
    store: Arc<S>,
}

impl<S: KvStore> TokenBlacklist<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn token_key(tenant_id: Uuid, jti: Uuid) -> String {
        format!("blacklist:tenant:{tenant_id}:token:{jti}")
    }

    fn user_key(tenant_id: Uuid, user_id: Uuid) -> String {
        format!("blacklist:tenant:{tenant_id}:user:{user_id}")
    }

    /// Invalidates a single still-valid token. TTL is bounded by the
    /// token's own expiry; already-expired tokens are skipped since they
    /// are invalid independent of the blacklist.
    pub async fn blacklist_token(&self, claims: &Claims) -> crate::error::KvResult<()> {
        let ttl = (claims.exp - now_seconds()).max(0);
        if ttl == 0 {
            return Ok(());
        }
        self.store
            .set_ex(&Self::token_key(claims.tenant_id, claims.jti), "1", ttl)
            .await
    }

    /// Invalidates every token for a user within a tenant for `ttl_seconds`
    /// (normally the longest-lived token type's TTL, e.g. the refresh TTL).
    pub async fn blacklist_user(&self, tenant_id: Uuid, user_id: Uuid, ttl_seconds: i64) -> crate::error::KvResult<()> {
        self.store.set_ex(&Self::user_key(tenant_id, user_id), "1", ttl_seconds).await
    }

    /// True if the JTI or the user-wide key is set. Fails closed: any
    /// adapter error is itself reported as blacklisted.
    pub async fn is_token_blacklisted(&self, claims: &Claims) -> bool {
        let token_hit = self.store.exists(&Self::token_key(claims.tenant_id, claims.jti)).await;
        let user_hit = self.store.exists(&Self::user_key(claims.tenant_id, claims.sub)).await;
        match (token_hit, user_hit) {
            (Ok(t), Ok(u)) => t || u,
            _ => true,
        }
    }

    pub async fn is_user_blacklisted(&self, tenant_id: Uuid, user_id: Uuid) -> bool {
        self.store.exists(&Self::user_key(tenant_id, user_id)).await.unwrap_or(true)
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
    use docforge_core::tenant::TokenType;

    fn claims(tenant_id: Uuid, user_id: Uuid) -> Claims {
        Claims {
            sub: user_id,
            tenant_id,
            jti: Uuid::new_v4(),
            exp: now_seconds() + 900,
            iat: now_seconds(),
            token_type: TokenType::Access,
        }
    }

    #[tokio::test]
    async fn blacklisted_token_is_reported_blacklisted() {
        let blacklist = TokenBlacklist::new(Arc::new(MemoryStore::new()));
        let claims = claims(Uuid::new_v4(), Uuid::new_v4());
        assert!(!blacklist.is_token_blacklisted(&claims).await);
        blacklist.blacklist_token(&claims).await.unwrap();
        assert!(blacklist.is_token_blacklisted(&claims).await);
    }

    #[tokio::test]
    async fn blacklisting_one_tenants_jti_does_not_affect_another_tenant() {
        let blacklist = TokenBlacklist::new(Arc::new(MemoryStore::new()));
        let user_id = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();

        let mut claims_a = claims(tenant_a, user_id);
        claims_a.jti = jti;
        let mut claims_b = claims(tenant_b, user_id);
        claims_b.jti = jti;

        blacklist.blacklist_token(&claims_a).await.unwrap();
        assert!(blacklist.is_token_blacklisted(&claims_a).await);
        assert!(!blacklist.is_token_blacklisted(&claims_b).await);
    }

    #[tokio::test]
    async fn already_expired_token_write_is_skipped() {
        let blacklist = TokenBlacklist::new(Arc::new(MemoryStore::new()));
        let mut claims = claims(Uuid::new_v4(), Uuid::new_v4());
        claims.exp = now_seconds() - 10;
        blacklist.blacklist_token(&claims).await.unwrap();
        // Not blacklisted by this call, but already invalid on its own since expired.
        assert!(!blacklist.is_token_blacklisted(&claims).await);
    }

    #[tokio::test]
    async fn blacklisting_a_user_blacklists_all_their_tokens() {
        let blacklist = TokenBlacklist::new(Arc::new(MemoryStore::new()));
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let claims = claims(tenant_id, user_id);

        assert!(!blacklist.is_token_blacklisted(&claims).await);
        blacklist.blacklist_user(tenant_id, user_id, 900).await.unwrap();
        assert!(blacklist.is_token_blacklisted(&claims).await);
        assert!(blacklist.is_user_blacklisted(tenant_id, user_id).await);
    }
}
