//! Chatwire Error Types
//!
//! A single error type covers configuration, transport, provider and stream
//! failures. Cancellation is carried as [`ChatError::Aborted`] so it can travel
//! through `?`, but callers must treat it as a silent terminal state.

use thiserror::Error;

/// Main error type for chatwire operations
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// Configuration errors (invalid JSON, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider not found in registry
    #[error("Provider '{0}' not found. Add it to your providers.json with a `base_url`.")]
    ProviderNotFound(String),

    /// No configured provider serves the requested model
    #[error("Model '{0}' is not served by any configured provider. Use 'provider/model' or add it to a provider's `models`.")]
    UnknownModel(String),

    /// Provider is configured but no API key is available
    #[error("No API key available for '{provider}'. Set {env} or configure a key at runtime.")]
    NoApiKey { provider: String, env: String },

    /// Network failure before or independent of an HTTP response
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-2xx HTTP response
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        error_type: Option<String>,
    },

    /// Error reported by the provider inside an otherwise successful stream
    #[error("{message}")]
    Provider {
        message: String,
        error_type: Option<String>,
    },

    /// Response could not be interpreted
    #[error("Response error: {0}")]
    Response(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Connect or idle timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Request cancelled by the caller
    #[error("Request aborted")]
    Aborted,

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Whether this is a caller-initiated cancellation rather than a failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, ChatError::Aborted)
    }

    /// User-facing message.
    ///
    /// For provider-reported errors this is the provider's own message,
    /// verbatim, without any prefix.
    pub fn message(&self) -> String {
        match self {
            ChatError::Http { message, .. } | ChatError::Provider { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Stable type tag for the error
    pub fn error_type(&self) -> &str {
        match self {
            ChatError::Http { error_type, .. } => error_type.as_deref().unwrap_or("http_error"),
            ChatError::Provider { error_type, .. } => {
                error_type.as_deref().unwrap_or("provider_error")
            }
            ChatError::Config(_)
            | ChatError::ProviderNotFound(_)
            | ChatError::UnknownModel(_)
            | ChatError::NoApiKey { .. } => "config_error",
            ChatError::Transport(_) => "network_error",
            ChatError::Response(_) => "response_error",
            ChatError::Stream(_) => "stream_error",
            ChatError::Timeout(_) => "timeout",
            ChatError::Aborted => "aborted",
            ChatError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status, when the error came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatError::Timeout(err.to_string())
        } else if err.is_connect() {
            ChatError::Transport(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            ChatError::Response(format!("Failed to decode response: {}", err))
        } else {
            ChatError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Response(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Config(format!("IO error: {}", err))
    }
}

/// Build the text appended to a transcript when a stream fails.
///
/// Content already streamed to the user is kept as the prefix.
pub fn error_transcript(partial: &str, error: &ChatError) -> String {
    if partial.trim().is_empty() {
        format!("Error: {}", error.message())
    } else {
        format!("{}\n\n---\nError: {}", partial, error.message())
    }
}

/// Result type alias for chatwire operations
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_message_is_verbatim() {
        let err = ChatError::Http {
            status: 401,
            message: "Invalid API key".to_string(),
            error_type: Some("auth_error".to_string()),
        };
        assert_eq!(err.message(), "Invalid API key");
        assert_eq!(err.error_type(), "auth_error");
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_aborted());
    }

    #[test]
    fn test_error_type_fallbacks() {
        let err = ChatError::Http {
            status: 500,
            message: "Internal Server Error".to_string(),
            error_type: None,
        };
        assert_eq!(err.error_type(), "http_error");
        assert_eq!(ChatError::Transport("x".into()).error_type(), "network_error");
        assert_eq!(ChatError::UnknownModel("m".into()).error_type(), "config_error");
        assert!(ChatError::Aborted.is_aborted());
    }

    #[test]
    fn test_error_transcript_keeps_partial_output() {
        let err = ChatError::Transport("connection reset".to_string());
        let text = error_transcript("Hello wor", &err);
        assert!(text.starts_with("Hello wor"));
        assert!(text.ends_with("Error: Request failed: connection reset"));

        assert_eq!(
            error_transcript("", &err),
            "Error: Request failed: connection reset"
        );
    }
}
