//! HTTP plumbing shared by hosted providers.
//!
//! Maps transport failures and response statuses onto the provider error
//! taxonomy so that the retry loop can tell transient failures apart.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{ReelError, ReelResult};

/// Longest response body excerpt kept in error messages.
const BODY_EXCERPT_CHARS: usize = 300;

/// Build a client with the given per-request timeout.
pub fn build_client(timeout_secs: u64) -> ReelResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("reelforge/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| ReelError::config(format!("cannot build HTTP client: {e}")))
}

/// Classify an error raised while sending a request or reading its body.
pub fn classify_transport(provider: &str, err: reqwest::Error) -> ReelError {
    if err.is_timeout() || err.is_connect() {
        ReelError::timeout(provider, err.to_string())
    } else if err.is_decode() {
        ReelError::invalid_response(provider, err.to_string())
    } else {
        ReelError::unavailable(provider, err.to_string())
    }
}

/// Classify a non-success status code.
pub fn classify_status(provider: &str, status: StatusCode, body: &str) -> ReelError {
    let excerpt: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
    let message = format!("HTTP {status}: {excerpt}");
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            ReelError::rate_limited(provider, message)
        }
        s if s.is_server_error() => ReelError::rate_limited(provider, message),
        _ => ReelError::unavailable(provider, message),
    }
}

/// Pass successful responses through; turn the rest into provider errors.
pub async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> ReelResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(provider, status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(classify_status("openai", StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(classify_status("openai", StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(!classify_status("openai", StatusCode::UNAUTHORIZED, "").is_retryable());
        assert!(matches!(
            classify_status("openai", StatusCode::BAD_REQUEST, "nope"),
            ReelError::ProviderUnavailable { .. }
        ));
    }

    #[test]
    fn test_body_excerpt_is_bounded() {
        let body = "x".repeat(10_000);
        let err = classify_status("anthropic", StatusCode::FORBIDDEN, &body);
        assert!(err.to_string().len() < 500);
    }
}
