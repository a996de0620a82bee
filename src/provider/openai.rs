//! OpenAI-compatible adapter
//!
//! Covers OpenAI, DeepSeek and any custom endpoint speaking the
//! `/chat/completions` streaming shape.

use crate::api::{outgoing_messages, ChatDelta, ChatMessage, ChatRequestOptions};
use crate::client::http::PreparedRequest;
use crate::error::Result;
use crate::provider::error::in_stream_error;
use crate::router::ResolvedModel;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Streaming chat completion request
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    temperature: f64,
    max_tokens: u32,
}

/// A streaming chunk from the API
#[derive(Debug, Default, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

/// A choice in a streaming chunk
#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,

    #[serde(default)]
    finish_reason: Option<String>,
}

/// Delta content in a streaming chunk
#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,

    /// DeepSeek reasoner
    #[serde(default)]
    reasoning_content: Option<String>,

    /// OpenRouter and other gateways
    #[serde(default)]
    reasoning: Option<String>,
}

/// Adapter for OpenAI-compatible endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenAiCompatible;

impl OpenAiCompatible {
    /// Build `POST {base_url}/chat/completions`
    pub fn build_request(
        &self,
        messages: &[ChatMessage],
        options: &ChatRequestOptions,
        target: &ResolvedModel,
    ) -> Result<PreparedRequest> {
        let credentials = &target.credentials;
        let url = format!("{}/chat/completions", credentials.base_url.trim_end_matches('/'));

        let body = serde_json::to_value(CompletionRequest {
            model: &target.model,
            messages: outgoing_messages(messages, options),
            stream: true,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        })?;

        PreparedRequest::new(url, body)
            .with_extra_headers(&credentials.headers)
            .with_secret_header(AUTHORIZATION, &format!("Bearer {}", credentials.api_key))
    }

    /// Map one decoded event to a delta.
    ///
    /// Payloads without the expected fields are empty deltas.
    pub fn map_event(&self, payload: &serde_json::Value) -> Result<ChatDelta> {
        if let Some(error) = in_stream_error(payload) {
            return Err(error);
        }

        let chunk: StreamChunk = match serde_json::from_value(payload.clone()) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "Unexpected chunk shape, treating as empty delta");
                return Ok(ChatDelta::default());
            }
        };

        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(ChatDelta::default());
        };

        let delta = choice.delta.unwrap_or_default();
        let finish_reason = choice.finish_reason.filter(|r| !r.is_empty());

        Ok(ChatDelta {
            content: delta.content,
            reasoning: delta.reasoning_content.or(delta.reasoning),
            finished: finish_reason.is_some(),
            finish_reason,
        })
    }
}
