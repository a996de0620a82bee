//! Chat Request Types
//!
//! Provider-neutral messages and per-call options.

use serde::{Deserialize, Serialize};

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default completion token budget
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user" or "assistant"
    pub role: Role,

    /// Plain text content
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Options for a single chat call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequestOptions {
    /// Model name as the user selected it (e.g. "gpt-4", "gemini-2.5-flash")
    pub model: String,

    /// System prompt injected at the head of the conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl ChatRequestOptions {
    /// Create options for a model with default sampling settings
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The configured system prompt, if it has any non-whitespace content
    pub fn effective_system_prompt(&self) -> Option<&str> {
        self.system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
    }
}

/// Conversation as it should be sent upstream.
///
/// With a system prompt configured, exactly one system message sits at the
/// head and any system messages from the history are dropped. Without one,
/// the history is passed through untouched.
pub fn outgoing_messages(messages: &[ChatMessage], options: &ChatRequestOptions) -> Vec<ChatMessage> {
    match options.effective_system_prompt() {
        Some(prompt) => std::iter::once(ChatMessage::system(prompt))
            .chain(
                messages
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .cloned(),
            )
            .collect(),
        None => messages.to_vec(),
    }
}
