//! Error types shared across ReelForge crates.

use std::path::PathBuf;

/// Top-level error type for ReelForge operations.
///
/// Provider failures carry the name of the backend that produced them so the
/// run report can point at the failing collaborator. A provider returning zero
/// usable results is not represented here; it surfaces as an empty `Vec`.
#[derive(Debug, thiserror::Error)]
pub enum ReelError {
    #[error("Provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    #[error("Provider {provider} rate limited: {message}")]
    ProviderRateLimited { provider: String, message: String },

    #[error("Provider {provider} timed out: {message}")]
    ProviderTimeout { provider: String, message: String },

    #[error("Provider {provider} returned an invalid response: {message}")]
    ProviderInvalidResponse { provider: String, message: String },

    #[error("Source unreadable: {path}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("Render step '{step}' failed: {message}")]
    RenderStep { step: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported input: {message}")]
    UnsupportedInput { message: String },

    #[error("Interrupted by shutdown signal")]
    Interrupted,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelError.
pub type ReelResult<T> = Result<T, ReelError>;

impl ReelError {
    pub fn unavailable(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    pub fn rate_limited(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderRateLimited {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    pub fn timeout(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderInvalidResponse {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    pub fn source_unreadable(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn render_step(step: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RenderStep {
            step: step.into(),
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput {
            message: msg.into(),
        }
    }

    /// Whether the failure is transient and the call may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderRateLimited { .. } | Self::ProviderTimeout { .. }
        )
    }

    /// Short machine-friendly label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::ProviderRateLimited { .. } => "provider_rate_limited",
            Self::ProviderTimeout { .. } => "provider_timeout",
            Self::ProviderInvalidResponse { .. } => "provider_invalid_response",
            Self::SourceUnreadable { .. } => "source_unreadable",
            Self::RenderStep { .. } => "render_step_failure",
            Self::Config { .. } => "config",
            Self::UnsupportedInput { .. } => "unsupported_input",
            Self::Interrupted => "interrupted",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_and_timeout_are_retryable() {
        assert!(ReelError::rate_limited("openai", "429").is_retryable());
        assert!(ReelError::timeout("openai", "deadline").is_retryable());
        assert!(!ReelError::unavailable("openai", "no key").is_retryable());
        assert!(!ReelError::invalid_response("openai", "bad json").is_retryable());
        assert!(!ReelError::render_step("extract", "exit 1").is_retryable());
        assert!(!ReelError::Interrupted.is_retryable());
    }

    #[test]
    fn test_display_names_provider() {
        let err = ReelError::invalid_response("anthropic", "missing content");
        assert_eq!(
            err.to_string(),
            "Provider anthropic returned an invalid response: missing content"
        );
        assert_eq!(err.kind(), "provider_invalid_response");
    }
}
