//! Provider-neutral stream output.

use serde::{Deserialize, Serialize};

/// One decoded frame of a `text/event-stream` body
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A `data:` line carrying a JSON payload
    Data(serde_json::Value),

    /// The `[DONE]` sentinel
    Done,
}

/// An incremental fragment of model output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDelta {
    /// Final-answer text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Reasoning ("thinking") text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    /// Whether the stream is complete after this delta
    pub finished: bool,

    /// Provider's finish reason ("stop", "length", "STOP", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl ChatDelta {
    /// A delta carrying only content
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    /// A delta carrying only reasoning
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: Some(text.into()),
            ..Self::default()
        }
    }

    /// Terminal delta produced for the `[DONE]` sentinel
    pub fn done() -> Self {
        Self {
            finished: true,
            ..Self::default()
        }
    }

    /// Content text, if present and non-empty
    pub fn content_text(&self) -> Option<&str> {
        self.content.as_deref().filter(|s| !s.is_empty())
    }

    /// Reasoning text, if present and non-empty
    pub fn reasoning_text(&self) -> Option<&str> {
        self.reasoning.as_deref().filter(|s| !s.is_empty())
    }

    /// True when the delta carries neither text nor a finish signal
    pub fn is_empty(&self) -> bool {
        self.content_text().is_none() && self.reasoning_text().is_none() && !self.finished
    }
}
