//! Typewriter-paced stream session
//!
//! Bridges [`ChatCallbacks`] to a [`TranscriptSink`]: received text is paced
//! through one typewriter per channel, and the sink sees display updates
//! followed by exactly one completion or error.

use crate::api::{ChatMessage, ChatRequestOptions};
use crate::error::{error_transcript, ChatError};
use crate::router::CredentialResolver;
use crate::session::ConversationSessions;
use crate::typewriter::{PacingProfile, TypewriterHandle};
use crate::{ChatCallbacks, ChatOutcome, StreamingChatClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Display channel of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Content,
    Reasoning,
}

/// Conversation-store side of a stream session
pub trait TranscriptSink: Send + Sync {
    /// Paced display update; `displayed` is the full visible text so far
    fn on_display(&self, channel: Channel, displayed: &str);

    /// Stream finished; both texts are fully revealed
    fn on_complete(&self, content: &str, reasoning: &str);

    /// Stream failed. `transcript` keeps any partial content as prefix.
    fn on_error(&self, transcript: &str, error: &ChatError);
}

/// One stream's callbacks with paced display.
///
/// Must be created within a tokio runtime.
pub struct StreamSession {
    content: TypewriterHandle,
    reasoning: TypewriterHandle,
    token: CancellationToken,
    sink: Arc<dyn TranscriptSink>,
}

impl StreamSession {
    /// Start paced channels under `token`
    pub fn start(token: &CancellationToken, sink: Arc<dyn TranscriptSink>) -> Self {
        let content_sink = sink.clone();
        let content = TypewriterHandle::spawn(
            PacingProfile::content(),
            token,
            Arc::new(move |text: &str| content_sink.on_display(Channel::Content, text)),
        );

        let reasoning_sink = sink.clone();
        let reasoning = TypewriterHandle::spawn(
            PacingProfile::reasoning(),
            token,
            Arc::new(move |text: &str| reasoning_sink.on_display(Channel::Reasoning, text)),
        );

        Self {
            content,
            reasoning,
            token: token.clone(),
            sink,
        }
    }

    /// Stop both channels; the sink hears nothing further
    pub fn cancel(&self) {
        self.reasoning.cancel();
        self.content.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn accumulated_content(&self) -> String {
        self.content.accumulated()
    }

    pub fn displayed_content(&self) -> String {
        self.content.displayed()
    }

    pub fn accumulated_reasoning(&self) -> String {
        self.reasoning.accumulated()
    }

    pub fn displayed_reasoning(&self) -> String {
        self.reasoning.displayed()
    }
}

impl ChatCallbacks for StreamSession {
    fn on_chunk(&mut self, chunk: &str) {
        self.content.push(chunk);
    }

    fn on_reasoning_chunk(&mut self, chunk: &str) {
        self.reasoning.push(chunk);
    }

    fn on_complete(&mut self, _finish_reason: Option<&str>) {
        if self.is_cancelled() {
            return;
        }
        let reasoning = self.reasoning.finish();
        let content = self.content.finish();
        self.sink.on_complete(&content, &reasoning);
    }

    fn on_error(&mut self, error: &ChatError) {
        if self.is_cancelled() {
            return;
        }
        self.reasoning.finish();
        let content = self.content.finish();
        self.sink.on_error(&error_transcript(&content, error), error);
    }
}

impl<R: CredentialResolver> StreamingChatClient<R> {
    /// Run one chat call for a conversation with paced display.
    ///
    /// Starting a call cancels the conversation's previous call, if any.
    pub async fn chat_conversation(
        &self,
        sessions: &ConversationSessions,
        conversation_id: &str,
        messages: &[ChatMessage],
        options: &ChatRequestOptions,
        sink: Arc<dyn TranscriptSink>,
    ) -> ChatOutcome {
        let ticket = sessions.begin(conversation_id);
        let mut session = StreamSession::start(ticket.token(), sink);

        let outcome = self.chat(messages, &mut session, options, ticket.token()).await;
        if outcome.is_aborted() {
            session.cancel();
        }

        sessions.end(&ticket);
        outcome
    }
}
