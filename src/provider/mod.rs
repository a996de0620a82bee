//! Provider Adapters
//!
//! One variant per wire protocol. Adding a provider shape means adding a
//! variant here; the chat client only ever talks to [`ProviderAdapter`].

pub mod error;
pub mod google;
pub mod openai;

pub use error::parse_error_body;
pub use google::GoogleAi;
pub use openai::OpenAiCompatible;

use crate::api::{ChatDelta, ChatMessage, ChatRequestOptions, StreamEvent};
use crate::client::http::{HttpClient, PreparedRequest};
use crate::config::ApiFormat;
use crate::error::Result;
use crate::router::{ProviderCredentials, ResolvedModel};
use async_stream::stream;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Provider-neutral delta stream
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<ChatDelta>> + Send>>;

/// Wire-protocol adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderAdapter {
    OpenAiCompatible(OpenAiCompatible),
    GoogleAi(GoogleAi),
}

impl ProviderAdapter {
    /// Adapter for an API format
    pub fn for_format(format: ApiFormat) -> Self {
        match format {
            ApiFormat::Openai => ProviderAdapter::OpenAiCompatible(OpenAiCompatible),
            ApiFormat::Google => ProviderAdapter::GoogleAi(GoogleAi),
        }
    }

    /// Adapter for resolved credentials.
    ///
    /// A declared format wins; otherwise the provider id decides, with
    /// anything unrecognised treated as OpenAI-compatible.
    pub fn for_credentials(credentials: &ProviderCredentials) -> Self {
        let format = credentials
            .api_format
            .unwrap_or_else(|| ApiFormat::for_provider_id(&credentials.provider_id));
        Self::for_format(format)
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ProviderAdapter::OpenAiCompatible(_) => "openai-compatible",
            ProviderAdapter::GoogleAi(_) => "google-ai",
        }
    }

    /// Translate a neutral request into the provider's HTTP request
    pub fn build_request(
        &self,
        messages: &[ChatMessage],
        options: &ChatRequestOptions,
        target: &ResolvedModel,
    ) -> Result<PreparedRequest> {
        match self {
            ProviderAdapter::OpenAiCompatible(adapter) => {
                adapter.build_request(messages, options, target)
            }
            ProviderAdapter::GoogleAi(adapter) => adapter.build_request(messages, options, target),
        }
    }

    /// Translate one decoded stream event into a neutral delta
    pub fn map_event(&self, event: &StreamEvent) -> Result<ChatDelta> {
        match event {
            StreamEvent::Done => Ok(ChatDelta::done()),
            StreamEvent::Data(payload) => match self {
                ProviderAdapter::OpenAiCompatible(adapter) => adapter.map_event(payload),
                ProviderAdapter::GoogleAi(adapter) => adapter.map_event(payload),
            },
        }
    }

    /// Send the request and stream neutral deltas.
    ///
    /// The stream ends after the first finished delta or the first error.
    pub async fn stream_chat(
        &self,
        http: &HttpClient,
        messages: &[ChatMessage],
        options: &ChatRequestOptions,
        target: &ResolvedModel,
        cancel: &CancellationToken,
    ) -> Result<DeltaStream> {
        let request = self.build_request(messages, options, target)?;
        debug!(
            adapter = self.name(),
            provider = %target.credentials.provider_id,
            model = %target.model,
            url = %request.url,
            "Opening chat stream"
        );

        let mut events = http.post_events(&request, cancel).await?;
        let adapter = *self;

        let s = stream! {
            while let Some(event) = events.next().await {
                let delta = event.and_then(|event| adapter.map_event(&event));
                let stop = match &delta {
                    Ok(delta) => delta.finished,
                    Err(_) => true,
                };
                yield delta;
                if stop {
                    break;
                }
            }
        };

        Ok(Box::pin(s))
    }
}
