//! Tenant/user authentication context (C1): JWT issuance and verification,
//! and the axum extractor that turns a bearer token into an authorized
//! request context carrying the caller's role inside the active project.

use chrono::{Duration, Utc};
use docforge_types::permissions::{Permission, Role};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("token is malformed or signature is invalid")]
    InvalidToken,
    #[error("token has expired")]
    Expired,
    #[error("token has been revoked")]
    Revoked,
    #[error("caller lacks permission {0:?}")]
    Forbidden(Permission),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user id.
    pub sub: Uuid,
    pub tenant_id: Uuid,
    /// JWT id, used as the blacklist key on logout/revocation.
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    pub fn issue_pair(&self, user_id: Uuid, tenant_id: Uuid) -> anyhow::Result<(String, String, i64)> {
        let access = self.issue(user_id, tenant_id, TokenType::Access, self.access_ttl)?;
        let refresh = self.issue(user_id, tenant_id, TokenType::Refresh, self.refresh_ttl)?;
        Ok((access, refresh, self.access_ttl.num_seconds()))
    }

    fn issue(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        token_type: TokenType,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            tenant_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Decodes and validates signature/expiry only. Blacklist lookup is a
    /// separate step so this function stays infallible w.r.t. I/O.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            })?;
        Ok(data.claims)
    }
}

/// The resolved identity and RBAC role attached to a request after auth
/// middleware and project-membership lookup both succeed.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub project_id: Option<Uuid>,
    pub role: Option<Role>,
}

impl AuthContext {
    /// Fails closed: no project membership resolved yet means no permission
    /// is granted, even for an otherwise-valid token.
    pub fn require(&self, permission: Permission) -> Result<(), AuthError> {
        match self.role {
            Some(role) if role.grants(permission) => Ok(()),
            _ => Err(AuthError::Forbidden(permission)),
        }
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use argon2::Argon2;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    use argon2::Argon2;
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_access_token_decodes_with_matching_secret() {
        let issuer = TokenIssuer::new(b"test-secret");
        let user_id = Uuid::new_v4();
        let tenant_id = Uuid::new_v4();
        let (access, _refresh, expires_in) = issuer.issue_pair(user_id, tenant_id).unwrap();
        assert!(expires_in > 0);
        let claims = issuer.decode(&access).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.tenant_id, tenant_id);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn decode_rejects_token_signed_with_different_secret() {
        let issuer_a = TokenIssuer::new(b"secret-a");
        let issuer_b = TokenIssuer::new(b"secret-b");
        let (access, _, _) = issuer_a.issue_pair(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        assert!(matches!(issuer_b.decode(&access), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn password_round_trips_through_hash_and_verify() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn auth_context_denies_permission_without_resolved_role() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            project_id: None,
            role: None,
        };
        assert!(matches!(
            ctx.require(Permission::ProjectRead),
            Err(AuthError::Forbidden(_))
        ));
    }

    #[test]
    fn auth_context_grants_permission_role_carries() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            project_id: Some(Uuid::new_v4()),
            role: Some(Role::Viewer),
        };
        assert!(ctx.require(Permission::ProjectRead).is_ok());
        assert!(matches!(
            ctx.require(Permission::ProjectWrite),
            Err(AuthError::Forbidden(_))
        ));
    }
}
