//! Provider error bodies.

use crate::error::ChatError;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,

    /// OpenAI-style type ("invalid_request_error", "auth_error", ...)
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,

    /// Google-style status ("UNAUTHENTICATED", "INVALID_ARGUMENT", ...)
    #[serde(default)]
    pub status: Option<String>,
}

impl ErrorBody {
    fn kind(&self) -> Option<String> {
        self.error_type.clone().or_else(|| self.status.clone())
    }
}

/// Convert a non-2xx response into a [`ChatError::Http`].
///
/// Uses `error.message` / `error.type` when the body is a structured error,
/// otherwise the HTTP status text.
pub fn parse_error_body(status: StatusCode, body: &str) -> ChatError {
    let parsed = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| error_value(&value).map(error_body));

    let status_text = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    let (message, error_type) = match parsed {
        Some(error) => {
            let error_type = error.kind();
            let message = error
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(status_text);
            (message, error_type)
        }
        None => (status_text, None),
    };

    ChatError::Http {
        status: status.as_u16(),
        message,
        error_type,
    }
}

/// The `error` member of a body, unwrapping Google's `[{"error": {...}}]` form
fn error_value(value: &serde_json::Value) -> Option<&serde_json::Value> {
    let envelope = match value {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    envelope.get("error").filter(|error| !error.is_null())
}

/// Error objects and bare error strings both carry a message
fn error_body(error: &serde_json::Value) -> ErrorBody {
    match error {
        serde_json::Value::String(message) => ErrorBody {
            message: Some(message.clone()),
            ..ErrorBody::default()
        },
        other => serde_json::from_value(other.clone()).unwrap_or_default(),
    }
}

/// Error object embedded in a stream frame, if the payload is one
pub(crate) fn in_stream_error(payload: &serde_json::Value) -> Option<ChatError> {
    let error = payload.get("error").filter(|error| !error.is_null())?;
    let body = error_body(error);
    let error_type = body.kind();

    Some(ChatError::Provider {
        message: body
            .message
            .unwrap_or_else(|| "Provider reported an error".to_string()),
        error_type,
    })
}
