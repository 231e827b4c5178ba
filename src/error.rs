//! Error handling for the generation-orchestration core.
//!
//! Every failure surfaced by this crate carries enough of the original
//! detail (status code, raw body) to support post-hoc diagnosis. Transport
//! failures and non-2xx provider responses are kept distinct from
//! caller-input mistakes so the serving layer can map them to different
//! status codes.

use thiserror::Error;

/// Unified error type for all generation operations.
#[derive(Debug, Error)]
pub enum GenError {
    /// The caller supplied an invalid or incomplete request. No provider
    /// call has been made when this is returned.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider answered with a non-success status.
    #[error("API error {code}: {message}")]
    ApiError {
        code: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The provider payload could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A successful provider response contained no recognizable artifact.
    #[error("No artifact found: {0}")]
    ExtractionError(String),

    /// An async job exceeded its polling budget.
    #[error("Timed out: {0}")]
    TimeoutError(String),

    /// The artifact store collaborator failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Session verification failed.
    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse error classification used by serving layers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Caller,
    Transport,
    Provider,
    Extraction,
    Timeout,
    Storage,
    Auth,
    Internal,
}

impl GenError {
    /// Convenience constructor for provider error responses.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) => ErrorCategory::Caller,
            Self::HttpError(_) => ErrorCategory::Transport,
            Self::ApiError { .. } => ErrorCategory::Provider,
            Self::ParseError(_) => ErrorCategory::Provider,
            Self::ExtractionError(_) => ErrorCategory::Extraction,
            Self::TimeoutError(_) => ErrorCategory::Timeout,
            Self::StorageError(_) => ErrorCategory::Storage,
            Self::AuthError(_) => ErrorCategory::Auth,
            Self::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error originates upstream of the caller. Serving layers
    /// map upstream failures to a gateway-error status, never to the
    /// caller-input status.
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport
                | ErrorCategory::Provider
                | ErrorCategory::Extraction
                | ErrorCategory::Timeout
        )
    }

    /// Display string safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::ApiError { message, .. } => message.clone(),
            Self::ExtractionError(msg) => msg.clone(),
            Self::TimeoutError(msg) => msg.clone(),
            Self::AuthError(msg) => msg.clone(),
            Self::HttpError(_) | Self::ParseError(_) => "Provider Error".to_string(),
            Self::StorageError(_) | Self::InternalError(_) => "Server Error".to_string(),
        }
    }

    /// Extract the human-readable message from a provider error body.
    ///
    /// Providers usually answer `{"error": {"message": "..."}}`, but some
    /// return plain text; the raw body is the fallback.
    pub fn upstream_message(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string())
    }
}

impl From<reqwest::Error> for GenError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for GenError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_not_upstream() {
        assert!(!GenError::InvalidInput("missing prompt".into()).is_upstream());
        assert!(GenError::api_error(500, "boom").is_upstream());
        assert!(GenError::HttpError("connect refused".into()).is_upstream());
        assert!(GenError::TimeoutError("poll budget".into()).is_upstream());
        assert!(!GenError::AuthError("bad token".into()).is_upstream());
    }

    #[test]
    fn upstream_message_prefers_structured_error() {
        let body = r#"{"error":{"message":"model overloaded"}}"#;
        assert_eq!(GenError::upstream_message(body), "model overloaded");
        assert_eq!(GenError::upstream_message("plain failure"), "plain failure");
    }
}
