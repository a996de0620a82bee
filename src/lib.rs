//! Chatwire - streaming chat client core
//!
//! Talks to OpenAI-compatible and Google AI chat endpoints over SSE behind a
//! single callback interface, with mid-stream cancellation and typewriter-paced
//! display of received text.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod router;
pub mod session;
pub mod typewriter;

pub use api::{ChatDelta, ChatMessage, ChatRequestOptions, Role, StreamEvent};
pub use client::HttpClient;
pub use config::{ApiFormat, ClientSettings, ConfigLoader, ProvidersConfig};
pub use error::{error_transcript, ChatError, Result};
pub use provider::{DeltaStream, ProviderAdapter};
pub use router::{CredentialResolver, ProviderCredentials, ProviderRegistry, ResolvedModel};
pub use session::{Channel, ConversationSessions, SessionTicket, StreamSession, TranscriptSink};
pub use typewriter::{PacingProfile, Typewriter, TypewriterHandle};

/// Receives the output of one chat call.
///
/// Chunk callbacks fire in arrival order, once per non-empty delta. Then at
/// most one of `on_complete` / `on_error` fires, and nothing after it. A
/// cancelled call ends with neither.
pub trait ChatCallbacks: Send {
    fn on_chunk(&mut self, chunk: &str);

    fn on_reasoning_chunk(&mut self, _chunk: &str) {}

    fn on_complete(&mut self, finish_reason: Option<&str>);

    fn on_error(&mut self, error: &ChatError);
}

/// How a chat call ended
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Completed { finish_reason: Option<String> },
    Failed(ChatError),
    Aborted,
}

impl ChatOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ChatOutcome::Completed { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, ChatOutcome::Aborted)
    }

    pub fn error(&self) -> Option<&ChatError> {
        match self {
            ChatOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// The streaming chat client
pub struct StreamingChatClient<R = ProviderRegistry> {
    /// Model → provider credential lookup
    resolver: R,

    /// HTTP transport
    http: HttpClient,
}

impl StreamingChatClient<ProviderRegistry> {
    /// Create a client over the provider registry from default config locations
    pub fn new() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::from_config(loader.into_config())
    }

    /// Create a client with a custom config path
    pub fn with_config_path(path: &str) -> Result<Self> {
        let loader = ConfigLoader::from_path(path)?;
        Self::from_config(loader.into_config())
    }

    /// Create a client from a config object
    pub fn from_config(config: ProvidersConfig) -> Result<Self> {
        let settings = config.client.clone().unwrap_or_default();
        Self::with_settings(ProviderRegistry::from_config(config), &settings)
    }
}

impl<R: CredentialResolver> StreamingChatClient<R> {
    /// Create a client with a caller-provided resolver and default settings
    pub fn with_resolver(resolver: R) -> Result<Self> {
        Self::with_settings(resolver, &ClientSettings::default())
    }

    /// Create a client with a caller-provided resolver and settings
    pub fn with_settings(resolver: R, settings: &ClientSettings) -> Result<Self> {
        Ok(Self {
            resolver,
            http: HttpClient::with_settings(settings)?,
        })
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Open a delta stream for one call.
    ///
    /// Credentials and adapter are resolved from `options.model` on every
    /// call; resolution failures return before any network I/O.
    pub async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &ChatRequestOptions,
        cancel: &CancellationToken,
    ) -> Result<DeltaStream> {
        let target = self.resolver.resolve_model(&options.model)?;
        let adapter = ProviderAdapter::for_credentials(&target.credentials);
        debug!(
            model = %options.model,
            provider = %target.credentials.provider_id,
            adapter = adapter.name(),
            "Selected adapter"
        );

        adapter
            .stream_chat(&self.http, messages, options, &target, cancel)
            .await
    }

    /// Run one chat call, reporting through `callbacks`
    pub async fn chat<C: ChatCallbacks + ?Sized>(
        &self,
        messages: &[ChatMessage],
        callbacks: &mut C,
        options: &ChatRequestOptions,
        cancel: &CancellationToken,
    ) -> ChatOutcome {
        let started = tokio::time::Instant::now();

        match self.run(messages, callbacks, options, cancel).await {
            Ok(finish_reason) => {
                info!(
                    model = %options.model,
                    finish_reason = ?finish_reason,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Chat stream completed"
                );
                callbacks.on_complete(finish_reason.as_deref());
                ChatOutcome::Completed { finish_reason }
            }
            Err(e) if e.is_aborted() || cancel.is_cancelled() => {
                info!(model = %options.model, "Chat stream cancelled");
                ChatOutcome::Aborted
            }
            Err(e) => {
                warn!(model = %options.model, error = %e, "Chat stream failed");
                callbacks.on_error(&e);
                ChatOutcome::Failed(e)
            }
        }
    }

    async fn run<C: ChatCallbacks + ?Sized>(
        &self,
        messages: &[ChatMessage],
        callbacks: &mut C,
        options: &ChatRequestOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let mut deltas = self.stream(messages, options, cancel).await?;

        while let Some(delta) = deltas.next().await {
            if cancel.is_cancelled() {
                return Err(ChatError::Aborted);
            }
            let delta = delta?;

            if let Some(reasoning) = delta.reasoning_text() {
                callbacks.on_reasoning_chunk(reasoning);
            }
            if let Some(content) = delta.content_text() {
                if cancel.is_cancelled() {
                    return Err(ChatError::Aborted);
                }
                callbacks.on_chunk(content);
            }
            if delta.finished {
                return Ok(delta.finish_reason);
            }
        }

        if cancel.is_cancelled() {
            return Err(ChatError::Aborted);
        }

        // Body closed without [DONE] or a finish reason (normal for Google AI)
        Ok(None)
    }
}
