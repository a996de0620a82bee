//! API Module
//!
//! Provider-neutral chat types and SSE stream decoding.

pub mod chat;
pub mod delta;
pub mod sse;

pub use chat::{
    outgoing_messages, ChatMessage, ChatRequestOptions, Role, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE,
};
pub use delta::{ChatDelta, StreamEvent};
pub use sse::{SseDecoder, SseStream, DEFAULT_MAX_CONSECUTIVE_MALFORMED};
