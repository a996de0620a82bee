//! HTTP Client
//!
//! Streaming POST transport with cancellation and idle timeout handling.

use crate::api::sse::{SseDecoder, SseStream};
use crate::config::ClientSettings;
use crate::error::{ChatError, Result};
use crate::provider::error::parse_error_body;
use async_stream::stream;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Response body as a stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// A provider request ready to send
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl PreparedRequest {
    /// Create a JSON POST request expecting an event stream back
    pub fn new(url: String, body: serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        Self { url, headers, body }
    }

    /// Add a secret header (marked sensitive so it is never logged)
    pub fn with_secret_header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(value)
            .map_err(|e| ChatError::Config(format!("Invalid API key format: {}", e)))?;
        value.set_sensitive(true);
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add extra headers from provider configuration, skipping invalid ones
    pub fn with_extra_headers<'a>(
        mut self,
        extra: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        for (key, value) in extra {
            if let (Ok(name), Ok(val)) = (
                HeaderName::try_from(key.as_str()),
                HeaderValue::from_str(value),
            ) {
                self.headers.insert(name, val);
            }
        }
        self
    }
}

/// Outcome of one body read
enum Read {
    Chunk(Bytes),
    Closed,
    Failed(ChatError),
}

/// HTTP client for streaming chat requests
pub struct HttpClient {
    /// Inner reqwest client
    client: Client,

    /// Maximum wait for the next body chunk
    idle_timeout: Option<Duration>,

    /// Unparseable SSE frames tolerated in a row
    max_consecutive_malformed: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&ClientSettings::default())
    }

    /// Create a new HTTP client from settings
    pub fn with_settings(settings: &ClientSettings) -> Result<Self> {
        // No overall timeout: a long generation is not a hung request
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ChatError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            idle_timeout: settings.idle_timeout(),
            max_consecutive_malformed: settings.max_consecutive_malformed,
        })
    }

    /// Send a streaming POST and return the response body.
    ///
    /// Non-2xx responses become [`ChatError::Http`]. Cancelling `cancel`
    /// while waiting for headers or body yields [`ChatError::Aborted`].
    pub async fn post_stream(
        &self,
        request: &PreparedRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream> {
        if cancel.is_cancelled() {
            return Err(ChatError::Aborted);
        }

        let send = self
            .client
            .post(&request.url)
            .headers(request.headers.clone())
            .json(&request.body)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Aborted),
            response = send => response?,
        };

        let status = response.status();
        debug!(url = %request.url, status = %status, "Stream response headers received");

        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Aborted),
                body = response.text() => body.unwrap_or_default(),
            };
            return Err(parse_error_body(status, &body));
        }

        let mut body = Box::pin(response.bytes_stream());
        let cancel = cancel.clone();
        let idle_timeout = self.idle_timeout;

        let s = stream! {
            loop {
                let read = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Read::Failed(ChatError::Aborted),
                    read = next_chunk(&mut body, idle_timeout) => read,
                };

                match read {
                    Read::Chunk(chunk) => yield Ok(chunk),
                    Read::Closed => break,
                    Read::Failed(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(s))
    }

    /// Send a streaming POST and decode the body as server-sent events
    pub async fn post_events(
        &self,
        request: &PreparedRequest,
        cancel: &CancellationToken,
    ) -> Result<SseStream<ByteStream>> {
        let body = self.post_stream(request, cancel).await?;
        Ok(SseStream::new(
            body,
            SseDecoder::with_malformed_limit(self.max_consecutive_malformed),
        ))
    }
}

async fn next_chunk<S>(body: &mut S, idle_timeout: Option<Duration>) -> Read
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, body.next()).await {
            Ok(next) => next,
            Err(_) => {
                return Read::Failed(ChatError::Timeout(format!(
                    "no data received for {}s",
                    limit.as_secs()
                )))
            }
        },
        None => body.next().await,
    };

    match next {
        Some(Ok(chunk)) => Read::Chunk(chunk),
        Some(Err(e)) => Read::Failed(e.into()),
        None => Read::Closed,
    }
}
