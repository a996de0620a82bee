//! Server-Sent Events Decoder
//!
//! Incremental `text/event-stream` framing: byte chunks in, [`StreamEvent`]s
//! out. Chunk boundaries need not line up with line boundaries.

use crate::api::delta::StreamEvent;
use crate::error::{ChatError, Result};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::warn;

/// Default number of unparseable frames tolerated in a row
pub const DEFAULT_MAX_CONSECUTIVE_MALFORMED: usize = 32;

const DATA_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Incremental SSE line decoder
#[derive(Debug)]
pub struct SseDecoder {
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,

    /// Set once `[DONE]` has been seen
    done: bool,

    /// Unparseable frames seen since the last good one
    consecutive_malformed: usize,

    max_consecutive_malformed: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    /// Create a decoder with the default malformed-frame tolerance
    pub fn new() -> Self {
        Self::with_malformed_limit(DEFAULT_MAX_CONSECUTIVE_MALFORMED)
    }

    /// Create a decoder that fails after `limit` unparseable frames in a row
    pub fn with_malformed_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            done: false,
            consecutive_malformed: 0,
            max_consecutive_malformed: limit.max(1),
        }
    }

    /// Whether the `[DONE]` sentinel has been decoded
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one chunk and return every event completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        if self.done {
            return Ok(events);
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();
            start = end + 1;

            if let Some(event) = self.decode_line(&line)? {
                let is_done = event == StreamEvent::Done;
                events.push(event);
                if is_done {
                    self.buffer.clear();
                    return Ok(events);
                }
            }
        }
        self.buffer.drain(..start);

        Ok(events)
    }

    /// Flush the trailing line once the byte stream has closed
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return Ok(Vec::new());
        }

        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Ok(self.decode_line(&line)?.into_iter().collect())
    }

    fn decode_line(&mut self, line: &str) -> Result<Option<StreamEvent>> {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with(':') {
            return Ok(None);
        }

        // event:, id: and retry: fields carry nothing we route on
        let Some(payload) = line.strip_prefix(DATA_MARKER) else {
            return Ok(None);
        };
        let payload = payload.trim();

        if payload == DONE_SENTINEL {
            self.done = true;
            return Ok(Some(StreamEvent::Done));
        }

        match serde_json::from_str(payload) {
            Ok(value) => {
                self.consecutive_malformed = 0;
                Ok(Some(StreamEvent::Data(value)))
            }
            Err(e) => {
                self.consecutive_malformed += 1;
                warn!(
                    error = %e,
                    payload = %truncate(payload, 200),
                    consecutive = self.consecutive_malformed,
                    "Skipping malformed SSE frame"
                );
                if self.consecutive_malformed >= self.max_consecutive_malformed {
                    return Err(ChatError::Stream(format!(
                        "{} consecutive malformed SSE frames",
                        self.consecutive_malformed
                    )));
                }
                Ok(None)
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pin_project! {
    /// Stream of [`StreamEvent`]s decoded from a byte stream.
    ///
    /// Ends when the byte stream closes, after `[DONE]`, or after the first
    /// error.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
        decoder: SseDecoder,
        pending: VecDeque<StreamEvent>,
        exhausted: bool,
    }
}

impl<S> SseStream<S>
where
    S: Stream<Item = Result<Bytes>>,
{
    pub fn new(inner: S, decoder: SseDecoder) -> Self {
        Self {
            inner,
            decoder,
            pending: VecDeque::new(),
            exhausted: false,
        }
    }
}

impl<S> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes>>,
{
    type Item = Result<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if *this.exhausted || this.decoder.is_done() {
                return Poll::Ready(None);
            }

            let decoded = match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.decoder.feed(&chunk),
                Some(Err(e)) => Err(e),
                None => {
                    *this.exhausted = true;
                    this.decoder.finish()
                }
            };

            match decoded {
                Ok(events) => this.pending.extend(events),
                Err(e) => {
                    *this.exhausted = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    const STREAM: &str = concat!(
        ": keep-alive\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        "\n",
        "event: message\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo \\u00e9\u{4e16}\"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n",
        "\n",
        "data: [DONE]\n",
        "\n",
    );

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.feed(chunk).unwrap());
        }
        events.extend(decoder.finish().unwrap());
        events
    }

    #[test]
    fn test_decode_unsplit_stream() {
        let events = decode_all(&[STREAM.as_bytes()]);
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            StreamEvent::Data(json!({"choices":[{"delta":{"content":"Hel"}}]}))
        );
        assert_eq!(
            events[1],
            StreamEvent::Data(json!({"choices":[{"delta":{"content":"lo é世"}}]}))
        );
        assert_eq!(events[3], StreamEvent::Done);
    }

    #[test]
    fn test_every_split_point_yields_same_events() {
        let bytes = STREAM.as_bytes();
        let expected = decode_all(&[bytes]);

        // Covers splits inside the `data:` marker, inside JSON and inside
        // multi-byte characters.
        for split in 0..=bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), expected, "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = STREAM.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&chunks), decode_all(&[bytes]));
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let input = concat!(
            "data: {\"n\":1}\n",
            "data: {not valid json}\n",
            "data: {\"n\":2}\n",
        );
        let events = decode_all(&[input.as_bytes()]);
        assert_eq!(
            events,
            vec![
                StreamEvent::Data(json!({"n": 1})),
                StreamEvent::Data(json!({"n": 2})),
            ]
        );
    }

    #[test]
    fn test_consecutive_malformed_limit() {
        let mut decoder = SseDecoder::with_malformed_limit(3);
        assert!(decoder.feed(b"data: {bad\ndata: {bad\n").unwrap().is_empty());
        assert!(decoder.feed(b"data: {\"ok\":true}\n").unwrap().len() == 1);

        // Counter was reset by the good frame
        assert!(decoder.feed(b"data: {bad\ndata: {bad\n").unwrap().is_empty());
        let err = decoder.feed(b"data: {bad\n").unwrap_err();
        assert!(matches!(err, ChatError::Stream(_)));
    }

    #[test]
    fn test_done_stops_processing() {
        let mut decoder = SseDecoder::new();
        let events = decoder
            .feed(b"data: [DONE]\ndata: {\"late\":true}\n")
            .unwrap();
        assert_eq!(events, vec![StreamEvent::Done]);
        assert!(decoder.is_done());
        assert!(decoder.feed(b"data: {\"later\":true}\n").unwrap().is_empty());
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn test_crlf_and_missing_space() {
        let events = decode_all(&[b"data:{\"a\":1}\r\n\r\ndata:  [DONE]  \r\n"]);
        assert_eq!(
            events,
            vec![StreamEvent::Data(json!({"a": 1})), StreamEvent::Done]
        );
    }

    #[test]
    fn test_trailing_line_flushed_on_finish() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: {\"tail\":1}").unwrap().is_empty());
        assert_eq!(
            decoder.finish().unwrap(),
            vec![StreamEvent::Data(json!({"tail": 1}))]
        );
    }

    #[test]
    fn test_sse_stream_over_chunks() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"n\"")),
            Ok(Bytes::from_static(b":1}\n\nda")),
            Ok(Bytes::from_static(b"ta: [DONE]\n")),
            Ok(Bytes::from_static(b"data: {\"n\":2}\n")),
        ];
        let stream = SseStream::new(futures::stream::iter(chunks), SseDecoder::new());

        let events: Vec<_> = tokio_test::block_on(stream.collect::<Vec<_>>());
        let events: Vec<StreamEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            events,
            vec![StreamEvent::Data(json!({"n": 1})), StreamEvent::Done]
        );
    }

    #[test]
    fn test_sse_stream_surfaces_transport_error() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"data: {\"n\":1}\n")),
            Err(ChatError::Transport("connection reset".to_string())),
            Ok(Bytes::from_static(b"data: {\"n\":2}\n")),
        ];
        let stream = SseStream::new(futures::stream::iter(chunks), SseDecoder::new());

        let items = tokio_test::block_on(stream.collect::<Vec<_>>());
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(ChatError::Transport(_))));
    }
}
