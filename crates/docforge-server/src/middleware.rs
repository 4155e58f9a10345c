//! Cross-cutting HTTP layers: security headers on every response, a hard
//! request body size cap, sliding-window rate limiting with standard
//! response headers, and bearer-token authentication populating
//! [`docforge_core::AuthContext`].

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use docforge_core::tenant::{AuthContext, Claims};

use crate::error::AppError;
use crate::AppState;

const MAX_REQUEST_BODY_BYTES: u64 = 10 * 1024 * 1024;

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("X-XSS-Protection", HeaderValue::from_static("1; mode=block"));
    headers.insert(
        "Strict-Transport-Security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'self'; frame-ancestors 'none'"),
    );
    headers.insert("Referrer-Policy", HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=()"),
    );
    response
}

/// A malformed `Content-Length` is itself a 400; a well-formed one over the
/// cap is a 413. Chunked bodies without a declared length pass through here
/// and are bounded by axum's own default body limit instead.
pub async fn request_size_limit_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    if let Some(content_length) = request.headers().get(header::CONTENT_LENGTH) {
        let length_str = content_length
            .to_str()
            .map_err(|_| AppError::InvalidArgument("invalid Content-Length header".to_string()))?;
        let length: u64 = length_str
            .parse()
            .map_err(|_| AppError::InvalidArgument("invalid Content-Length header".to_string()))?;
        if length > MAX_REQUEST_BODY_BYTES {
            return Ok(StatusCode::PAYLOAD_TOO_LARGE.into_response());
        }
    }
    Ok(next.run(request).await)
}

/// Endpoint policy table: `path_prefix -> (limit, window_seconds)`.
fn rate_limit_policy(path: &str) -> (i64, i64) {
    if path.starts_with("/api/v1/auth/") {
        (10, 60)
    } else if path.starts_with("/api/v1/agents/") {
        (30, 60)
    } else {
        (120, 60)
    }
}

/// Tenant id if the bearer token decodes to a valid, non-expired signature
/// (blacklist status doesn't matter here, only identity), else the
/// forwarded-for header, else `X-Real-IP`, else the direct peer address.
fn client_identifier(request: &Request<Body>, claims: Option<&Claims>) -> String {
    if let Some(claims) = claims {
        return claims.tenant_id.to_string();
    }
    if let Some(forwarded) = request.headers().get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            return first.trim().to_string();
        }
    }
    if let Some(real_ip) = request.headers().get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

pub async fn rate_limit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let (limit, window) = rate_limit_policy(&path);

    // This layer runs before `auth_middleware`, so a request carrying a
    // valid bearer token hasn't had it turned into an `AuthContext` yet.
    // Decode it here (signature/expiry only) purely to key by tenant;
    // an invalid or absent token just falls through to peer identification,
    // `auth_middleware` is what actually rejects it.
    let claims = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.token_issuer.decode(token).ok());
    let key = format!("{}:{}", client_identifier(&request, claims.as_ref()), path);

    let decision = state.rate_limiter.check(&key, limit, window).await;
    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        AppError::RateLimitExceeded.into_response()
    };

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(decision.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(decision.reset_at));
    headers.insert("X-RateLimit-Window", HeaderValue::from(window));
    if let Some(note) = decision.error {
        if let Ok(value) = HeaderValue::from_str(&note) {
            headers.insert("X-RateLimit-Error", value);
        }
    }
    response
}

/// Resolves a bearer token into an [`AuthContext`]. Project membership
/// (and therefore `role`) is resolved per-request by the handler that
/// knows which project id is in play; this layer only proves "this is a
/// valid, non-blacklisted token for this tenant and user".
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::AuthRequired)?;
    let token = header.strip_prefix("Bearer ").ok_or(AppError::AuthRequired)?;

    let claims = state.token_issuer.decode(token)?;
    if state.token_blacklist.is_token_blacklisted(&claims).await {
        return Err(AppError::AuthFailed);
    }

    let ctx = AuthContext {
        user_id: claims.sub,
        tenant_id: claims.tenant_id,
        project_id: None,
        role: None,
    };
    request.extensions_mut().insert(ctx);
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
