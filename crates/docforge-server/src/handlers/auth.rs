//! Registration, login, token refresh/revocation and the small bits of
//! session introspection the frontend polls (`/auth/me`, validate-token).

use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use docforge_core::tenant::{AuthContext, Claims};
use docforge_core::{hash_password, verify_password};
use docforge_wire::auth::{
    BlacklistStatsResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenPairResponse,
    UserResponse, ValidateTokenRequest, ValidateTokenResponse,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

fn user_response(user: &docforge_types::tenant::User) -> UserResponse {
    UserResponse {
        id: user.id,
        tenant_id: user.tenant_id,
        email: user.email.clone(),
        username: user.username.clone(),
        is_superuser: user.is_superuser,
    }
}

/// Joins an existing tenant when `tenant_slug` is given; otherwise each
/// registration gets its own fresh tenant, named after the username.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let (slug, name) = match &body.tenant_slug {
        Some(slug) => (slug.clone(), slug.clone()),
        None => {
            let slug = format!("tenant-{}", Uuid::new_v4());
            (slug.clone(), format!("{}'s workspace", body.username))
        }
    };
    let tenant = state.accounts.get_or_create_tenant(&slug, &name).await?;
    let password_hash = hash_password(&body.password).map_err(|e| AppError::InvalidArgument(e.to_string()))?;
    let user = state
        .accounts
        .create_user(tenant.id, &body.email, &body.username, &password_hash)
        .await?;
    Ok((StatusCode::CREATED, Json(user_response(&user))))
}

/// Email is unique per tenant, not globally, so login resolves against
/// whichever tenant the address first registered in. A deployment that
/// needs strict per-tenant login should route callers through
/// `tenant_slug` at the UI layer before they ever reach this endpoint.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let user = state
        .accounts
        .get_user_by_email_any_tenant(&body.email)
        .await?
        .ok_or(AppError::AuthFailed)?;
    if !user.is_active {
        return Err(AppError::AuthFailed);
    }
    let hash = user.password_hash.as_deref().ok_or(AppError::AuthFailed)?;
    if !verify_password(&body.password, hash) {
        return Err(AppError::AuthFailed);
    }

    state.accounts.touch_last_login(user.id).await?;
    let (access_token, refresh_token, expires_in) = state
        .token_issuer
        .issue_pair(user.id, user.tenant_id)
        .map_err(|e| AppError::Agent(e.to_string()))?;

    Ok(Json(TokenPairResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let claims = state.token_issuer.decode(&body.refresh_token)?;
    if claims.token_type != docforge_core::TokenType::Refresh {
        return Err(AppError::AuthFailed);
    }
    if state.token_blacklist.is_token_blacklisted(&claims).await {
        return Err(AppError::AuthFailed);
    }
    let user = state.accounts.get_user(claims.sub).await?.ok_or(AppError::AuthFailed)?;
    if !user.is_active {
        return Err(AppError::AuthFailed);
    }

    let (access_token, refresh_token, expires_in) = state
        .token_issuer
        .issue_pair(user.id, user.tenant_id)
        .map_err(|e| AppError::Agent(e.to_string()))?;

    Ok(Json(TokenPairResponse {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in,
    }))
}

/// Blacklists only the presented token's jti, so any sibling access/refresh
/// token issued in the same pair stays valid until it separately expires.
pub async fn logout(State(state): State<AppState>, Extension(claims): Extension<Claims>) -> Result<StatusCode, AppError> {
    state
        .token_blacklist
        .blacklist_token(&claims)
        .await
        .map_err(|e| AppError::Agent(e.to_string()))?;
    state.blacklist_stats.blacklisted_tokens.fetch_add(1, Ordering::Relaxed);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, Extension(ctx): Extension<AuthContext>) -> Result<Json<UserResponse>, AppError> {
    let user = state.accounts.get_user(ctx.user_id).await?.ok_or(AppError::AuthFailed)?;
    Ok(Json(user_response(&user)))
}

/// Unlike the `auth_middleware` layer (which requires a valid token to reach
/// any protected handler at all), this endpoint is meant to be called with
/// a token that might be invalid, so it reports rather than rejects.
pub async fn validate_token(
    State(state): State<AppState>,
    Json(body): Json<ValidateTokenRequest>,
) -> Json<ValidateTokenResponse> {
    let Ok(claims) = state.token_issuer.decode(&body.token) else {
        return Json(ValidateTokenResponse {
            valid: false,
            user_id: None,
            tenant_id: None,
        });
    };
    if state.token_blacklist.is_token_blacklisted(&claims).await {
        return Json(ValidateTokenResponse {
            valid: false,
            user_id: None,
            tenant_id: None,
        });
    }
    Json(ValidateTokenResponse {
        valid: true,
        user_id: Some(claims.sub),
        tenant_id: Some(claims.tenant_id),
    })
}

pub async fn blacklist_stats(State(state): State<AppState>, Extension(ctx): Extension<AuthContext>) -> Result<Json<BlacklistStatsResponse>, AppError> {
    let user = state.accounts.get_user(ctx.user_id).await?.ok_or(AppError::AuthFailed)?;
    if !user.is_superuser {
        return Err(AppError::PermissionDenied);
    }
    Ok(Json(BlacklistStatsResponse {
        blacklisted_tokens: state.blacklist_stats.blacklisted_tokens.load(Ordering::Relaxed),
        blacklisted_users: state.blacklist_stats.blacklisted_users.load(Ordering::Relaxed),
    }))
}
