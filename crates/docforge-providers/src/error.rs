//! Adapter-facing error taxonomy. No provider implementation lets a raw
//! `reqwest`/`serde_json` error cross out of `provider.rs`; everything is
//! classified into one of these variants first, mirroring the single
//! boundary error type `docforge-server::error::AppError` uses for HTTP.

use thiserror::Error;

use crate::retry::RetryClassify;

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("network error contacting provider: {0}")]
    Network(String),
    #[error("provider rate-limited the request")]
    RateLimited,
    #[error("provider server error (status {status})")]
    ServerError { status: u16 },
    #[error("provider rejected the request (status {status}): {detail}")]
    ClientError { status: u16, detail: String },
    #[error("provider call timed out")]
    Timeout,
    #[error("provider returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("circuit open for provider `{0}`")]
    CircuitOpen(String),
    #[error("provider `{0}` is not configured. configured providers: {1}")]
    NotConfigured(String, String),
    #[error("all providers failed: {0}")]
    AllProvidersFailed(String),
}

impl RetryClassify for LlmError {
    /// Network blips, rate limits, upstream 5xxs and timeouts are worth a
    /// second try; a 4xx or a response we can't parse won't fix itself.
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Network(_) | LlmError::RateLimited | LlmError::ServerError { .. } | LlmError::Timeout
        )
    }
}

/// Classifies a `reqwest` transport failure before it's allowed to cross
/// the provider boundary.
pub fn classify_transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(err.to_string())
    }
}

/// Classifies an HTTP status the provider returned, given a human-readable
/// detail extracted from its error body (or a generic fallback).
pub fn classify_status(status: reqwest::StatusCode, detail: String) -> LlmError {
    if status.as_u16() == 429 {
        LlmError::RateLimited
    } else if status.is_client_error() {
        LlmError::ClientError { status: status.as_u16(), detail }
    } else if status.is_server_error() {
        LlmError::ServerError { status: status.as_u16() }
    } else {
        LlmError::Network(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_rate_limits_are_retryable() {
        assert!(LlmError::ServerError { status: 503 }.is_retryable());
        assert!(LlmError::RateLimited.is_retryable());
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::Network("connection reset".to_string()).is_retryable());
    }

    #[test]
    fn client_errors_and_malformed_responses_are_not_retryable() {
        assert!(!LlmError::ClientError { status: 400, detail: "bad request".to_string() }.is_retryable());
        assert!(!LlmError::MalformedResponse("no content".to_string()).is_retryable());
        assert!(!LlmError::CircuitOpen("openai".to_string()).is_retryable());
        assert!(!LlmError::NotConfigured("x".to_string(), "".to_string()).is_retryable());
        assert!(!LlmError::AllProvidersFailed("x".to_string()).is_retryable());
    }

    #[test]
    fn status_429_classifies_as_rate_limited_regardless_of_detail() {
        assert!(matches!(
            classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".to_string()),
            LlmError::RateLimited
        ));
    }

    #[test]
    fn status_5xx_classifies_as_server_error() {
        assert!(matches!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY, "".to_string()),
            LlmError::ServerError { status: 502 }
        ));
    }

    #[test]
    fn status_4xx_classifies_as_client_error() {
        assert!(matches!(
            classify_status(reqwest::StatusCode::UNAUTHORIZED, "bad key".to_string()),
            LlmError::ClientError { status: 401, .. }
        ));
    }
}
