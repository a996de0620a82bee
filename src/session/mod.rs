//! Conversation sessions
//!
//! At most one active stream per conversation. Starting a new one cancels the
//! previous one; ending a stale session never disturbs its successor.

pub mod stream;

pub use stream::{Channel, StreamSession, TranscriptSink};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug)]
struct ActiveSession {
    id: u64,
    token: CancellationToken,
}

/// Proof of one started session
#[derive(Debug, Clone)]
pub struct SessionTicket {
    conversation_id: String,
    id: u64,
    token: CancellationToken,
    started_at: DateTime<Utc>,
}

impl SessionTicket {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancellation token for this session
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Active-session table keyed by conversation id
#[derive(Debug, Default)]
pub struct ConversationSessions {
    active: Mutex<HashMap<String, ActiveSession>>,
    next_id: AtomicU64,
}

impl ConversationSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session, cancelling whatever was active for the conversation
    pub fn begin(&self, conversation_id: &str) -> SessionTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();

        let previous = self.active.lock().insert(
            conversation_id.to_string(),
            ActiveSession {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
            info!(
                conversation = conversation_id,
                superseded = previous.id,
                session = id,
                "Superseded active session"
            );
        } else {
            debug!(conversation = conversation_id, session = id, "Session started");
        }

        SessionTicket {
            conversation_id: conversation_id.to_string(),
            id,
            token,
            started_at: Utc::now(),
        }
    }

    /// Drop the session if it is still the active one
    pub fn end(&self, ticket: &SessionTicket) {
        let mut active = self.active.lock();
        if active
            .get(&ticket.conversation_id)
            .is_some_and(|session| session.id == ticket.id)
        {
            active.remove(&ticket.conversation_id);
            debug!(
                conversation = %ticket.conversation_id,
                session = ticket.id,
                elapsed_ms = (Utc::now() - ticket.started_at).num_milliseconds(),
                "Session ended"
            );
        }
    }

    /// Cancel the active session of a conversation.
    ///
    /// Returns false when nothing was active.
    pub fn cancel(&self, conversation_id: &str) -> bool {
        let removed = self.active.lock().remove(conversation_id);
        match removed {
            Some(session) => {
                session.token.cancel();
                info!(conversation = conversation_id, session = session.id, "Session cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, conversation_id: &str) -> bool {
        self.active.lock().contains_key(conversation_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}
