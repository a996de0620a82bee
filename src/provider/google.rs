//! Google AI adapter
//!
//! `models/{model}:streamGenerateContent` with `alt=sse`. Google has no system
//! role in `contents`, so system text travels as `systemInstruction`.

use crate::api::{outgoing_messages, ChatDelta, ChatMessage, ChatRequestOptions, Role};
use crate::client::http::PreparedRequest;
use crate::error::{ChatError, Result};
use crate::provider::error::in_stream_error;
use crate::router::ResolvedModel;
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};
use tracing::warn;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,

    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,

    /// Thinking models flag reasoning parts
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Adapter for the Google AI (Gemini) API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoogleAi;

impl GoogleAi {
    /// Build `POST {base_url}/v1beta/models/{model}:streamGenerateContent?alt=sse`
    pub fn build_request(
        &self,
        messages: &[ChatMessage],
        options: &ChatRequestOptions,
        target: &ResolvedModel,
    ) -> Result<PreparedRequest> {
        let credentials = &target.credentials;
        let base = credentials.base_url.trim_end_matches('/');
        let url = if base.ends_with("/v1beta") {
            format!("{}/models/{}:streamGenerateContent?alt=sse", base, target.model)
        } else {
            format!("{}/v1beta/models/{}:streamGenerateContent?alt=sse", base, target.model)
        };

        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for message in outgoing_messages(messages, options) {
            match message.role {
                Role::System => system_parts.push(Part {
                    text: message.content,
                }),
                Role::User => contents.push(Content {
                    role: "user",
                    parts: vec![Part {
                        text: message.content,
                    }],
                }),
                Role::Assistant => contents.push(Content {
                    role: "model",
                    parts: vec![Part {
                        text: message.content,
                    }],
                }),
            }
        }

        let body = serde_json::to_value(GenerateContentRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then_some(SystemInstruction {
                parts: system_parts,
            }),
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        })?;

        PreparedRequest::new(url, body)
            .with_extra_headers(&credentials.headers)
            .with_secret_header(HeaderName::from_static(API_KEY_HEADER), &credentials.api_key)
    }

    /// Map one decoded event to a delta
    pub fn map_event(&self, payload: &serde_json::Value) -> Result<ChatDelta> {
        if let Some(error) = in_stream_error(payload) {
            return Err(error);
        }

        let chunk: GenerateContentChunk = match serde_json::from_value(payload.clone()) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "Unexpected chunk shape, treating as empty delta");
                return Ok(ChatDelta::default());
            }
        };

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ChatError::Provider {
                    message: format!("Prompt blocked by provider: {}", reason),
                    error_type: Some("blocked".to_string()),
                });
            }
            return Ok(ChatDelta::default());
        };

        let mut content = String::new();
        let mut reasoning = String::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                if part.thought {
                    reasoning.push_str(&text);
                } else {
                    content.push_str(&text);
                }
            }
        }

        let finish_reason = candidate
            .finish_reason
            .filter(|r| !r.is_empty() && r != "FINISH_REASON_UNSPECIFIED");

        Ok(ChatDelta {
            content: (!content.is_empty()).then_some(content),
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
            finished: finish_reason.is_some(),
            finish_reason,
        })
    }
}
