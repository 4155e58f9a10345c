//! Single error surface for the HTTP boundary. Every handler returns
//! `Result<_, AppError>`; no adapter error type crosses a handler
//! signature directly, matching the taxonomy every other crate's error
//! already tags its variants with.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    AuthRequired,
    #[error("authentication failed")]
    AuthFailed,
    #[error("permission denied")]
    PermissionDenied,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    #[error("agent error: {0}")]
    Agent(String),
    #[error("all providers failed: {0}")]
    LlmUnavailable(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::AuthRequired | AppError::AuthFailed => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Agent(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::LlmUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Io(_) | AppError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            AppError::AuthRequired => "auth_required",
            AppError::AuthFailed => "auth_failed",
            AppError::PermissionDenied => "permission_denied",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::RateLimitExceeded => "rate_limit_exceeded",
            AppError::Agent(_) => "agent_error",
            AppError::LlmUnavailable(_) => "llm_unavailable",
            AppError::Database(_) | AppError::Io(_) | AppError::Serialization(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Adapter internals (SQL text, filesystem paths) never leave this
        // boundary; only the conceptual tag and a stable detail string do.
        let detail = match &self {
            AppError::Database(_) | AppError::Io(_) | AppError::Serialization(_) => {
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        if matches!(self, AppError::Database(_) | AppError::Io(_) | AppError::Serialization(_)) {
            tracing::error!(error = %self, "internal error surfaced to client");
        }
        let body = ErrorBody {
            error: self.tag().to_string(),
            detail,
            correlation_id: None,
        };
        (status, Json(json!(body))).into_response()
    }
}

impl From<docforge_documents::DocumentError> for AppError {
    fn from(err: docforge_documents::DocumentError) -> Self {
        match err {
            docforge_documents::DocumentError::NotFound(s) => AppError::NotFound(s),
            docforge_documents::DocumentError::MissingEpicNumber => {
                AppError::InvalidArgument(err.to_string())
            }
            docforge_documents::DocumentError::Database(e) => AppError::Database(e),
            docforge_documents::DocumentError::Serialization(e) => AppError::Serialization(e),
            docforge_documents::DocumentError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<docforge_export::ExportError> for AppError {
    fn from(err: docforge_export::ExportError) -> Self {
        match err {
            docforge_export::ExportError::NotFound(s) => AppError::NotFound(s),
            docforge_export::ExportError::InvalidExpiry(_) => AppError::InvalidArgument(err.to_string()),
            docforge_export::ExportError::Database(e) => AppError::Database(e),
            docforge_export::ExportError::Serialization(e) => AppError::Serialization(e),
            docforge_export::ExportError::Io(e) => AppError::Io(e),
            docforge_export::ExportError::Document(e) => e.into(),
            docforge_export::ExportError::Zip(e) => AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)),
        }
    }
}

impl From<docforge_orchestrator::OrchestratorError> for AppError {
    fn from(err: docforge_orchestrator::OrchestratorError) -> Self {
        AppError::Agent(err.to_string())
    }
}

impl From<docforge_core::AuthError> for AppError {
    fn from(err: docforge_core::AuthError) -> Self {
        match err {
            docforge_core::AuthError::MissingToken
            | docforge_core::AuthError::InvalidToken
            | docforge_core::AuthError::Expired
            | docforge_core::AuthError::Revoked => AppError::AuthFailed,
            docforge_core::AuthError::Forbidden(_) => AppError::PermissionDenied,
        }
    }
}
