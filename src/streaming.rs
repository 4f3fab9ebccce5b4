//! Incremental consumption of a generative backend response.
//!
//! A backend hands back one of three capabilities (push channel, pull stream
//! or a fully buffered text). [`BackendResponse::consume`] drives whichever
//! one it got to completion, forwarding each decoded increment to a
//! [`ChunkSink`] in arrival order while accumulating the full text.
//!
//! Sink delivery is at-most-once and best-effort per chunk: a failing sink
//! (typically a disconnected client) never aborts accumulation, so the
//! backend response is always drained and parsed.

use futures::stream::{BoxStream, StreamExt};
use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{CoreError, StreamFailure};
use crate::recipe::RecipeRecord;
use crate::recipe_parser::parse_recipe_response;

/// Events delivered over a push-style backend channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Data(Vec<u8>),
    End,
    Error(String),
}

/// The response capability a backend exposes.
pub enum BackendResponse {
    /// Producer-driven: the backend pushes events into a channel.
    Push(mpsc::Receiver<StreamEvent>),
    /// Consumer-driven: chunks are pulled until the stream is exhausted.
    Pull(BoxStream<'static, Result<Vec<u8>, StreamFailure>>),
    /// No streaming capability, the whole text is already available.
    Buffered(String),
}

impl fmt::Debug for BackendResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.capability())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("chunk sink rejected write: {0}")]
pub struct SinkError(pub String);

/// Receiver of streamed text increments.
pub trait ChunkSink {
    fn send(&mut self, chunk: &str) -> Result<(), SinkError>;
}

impl<S: ChunkSink + ?Sized> ChunkSink for &mut S {
    fn send(&mut self, chunk: &str) -> Result<(), SinkError> {
        (**self).send(chunk)
    }
}

impl ChunkSink for Vec<String> {
    fn send(&mut self, chunk: &str) -> Result<(), SinkError> {
        self.push(chunk.to_string());
        Ok(())
    }
}

/// Adapts a closure into a [`ChunkSink`].
pub struct FnSink<F>(F);

pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(&str) -> Result<(), SinkError>,
{
    FnSink(f)
}

impl<F> ChunkSink for FnSink<F>
where
    F: FnMut(&str) -> Result<(), SinkError>,
{
    fn send(&mut self, chunk: &str) -> Result<(), SinkError> {
        (self.0)(chunk)
    }
}

/// Sink that forwards chunks into an unbounded channel, e.g. towards a
/// client connection task.
pub struct ChannelSink(pub mpsc::UnboundedSender<String>);

impl ChunkSink for ChannelSink {
    fn send(&mut self, chunk: &str) -> Result<(), SinkError> {
        self.0
            .send(chunk.to_string())
            .map_err(|_| SinkError("receiver disconnected".to_string()))
    }
}

/// Incremental UTF-8 decoder.
///
/// Incomplete multi-byte sequences at the end of a chunk are held back until
/// the next chunk completes them. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if let Ok(prefix) = std::str::from_utf8(&self.pending[..valid]) {
                        out.push_str(prefix);
                    }
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flushes bytes still held back once the source has ended.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// Decodes, forwards and accumulates chunks for a single consume call.
struct Forwarder<'a, S: ?Sized> {
    sink: &'a mut S,
    decoder: Utf8Decoder,
    accumulated: String,
    chunks: usize,
    rejected: usize,
}

impl<'a, S: ChunkSink + ?Sized> Forwarder<'a, S> {
    fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            decoder: Utf8Decoder::new(),
            accumulated: String::new(),
            chunks: 0,
            rejected: 0,
        }
    }

    fn feed_bytes(&mut self, bytes: &[u8]) {
        let text = self.decoder.decode(bytes);
        self.forward(&text);
    }

    fn forward(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.accumulated.push_str(text);
        self.chunks += 1;
        if let Err(err) = self.sink.send(text) {
            self.rejected += 1;
            debug!(error = %err, chunk = self.chunks, "sink rejected chunk, continuing");
        }
    }

    fn finish(mut self) -> String {
        let rest = self.decoder.finish();
        self.forward(&rest);
        debug!(
            chunks = self.chunks,
            rejected = self.rejected,
            len = self.accumulated.len(),
            "stream drained"
        );
        self.accumulated
    }
}

impl BackendResponse {
    pub fn capability(&self) -> &'static str {
        match self {
            BackendResponse::Push(_) => "push",
            BackendResponse::Pull(_) => "pull",
            BackendResponse::Buffered(_) => "buffered",
        }
    }

    /// Drives the response to completion and returns the accumulated text.
    ///
    /// A transport error surfaces as [`StreamFailure`] and discards whatever
    /// was accumulated so far.
    pub async fn consume<S: ChunkSink + ?Sized>(self, sink: &mut S) -> Result<String, StreamFailure> {
        debug!(capability = self.capability(), "consuming backend response");
        let mut forwarder = Forwarder::new(sink);
        match self {
            BackendResponse::Push(mut events) => {
                // A channel closed without End counts as end-of-stream.
                while let Some(event) = events.recv().await {
                    match event {
                        StreamEvent::Data(bytes) => forwarder.feed_bytes(&bytes),
                        StreamEvent::End => break,
                        StreamEvent::Error(message) => return Err(StreamFailure(message)),
                    }
                }
            }
            BackendResponse::Pull(mut chunks) => {
                while let Some(chunk) = chunks.next().await {
                    forwarder.feed_bytes(&chunk?);
                }
            }
            BackendResponse::Buffered(text) => forwarder.forward(&text),
        }
        Ok(forwarder.finish())
    }
}

/// Consumes a backend response and parses the accumulated text into a draft.
pub async fn stream_recipe<S: ChunkSink + ?Sized>(
    response: BackendResponse,
    sink: &mut S,
) -> Result<RecipeRecord, CoreError> {
    let text = response.consume(sink).await?;
    Ok(parse_recipe_response(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    const PAYLOAD: &str = r#"{"title":"Soup","ingredients":["water","salt"],"instructions":["boil"],"prep_time":"5 minutes","difficulty":"Easy"}"#;

    fn pull_of(chunks: &[&[u8]]) -> BackendResponse {
        let items: Vec<Result<Vec<u8>, StreamFailure>> =
            chunks.iter().map(|c| Ok(c.to_vec())).collect();
        BackendResponse::Pull(stream::iter(items).boxed())
    }

    #[test]
    fn decoder_holds_back_split_multibyte_sequence() {
        let bytes = "crème brûlée".as_bytes();
        let mut decoder = Utf8Decoder::new();
        // "cr" + first byte of 'è'
        let first = decoder.decode(&bytes[..3]);
        assert_eq!(first, "cr");
        let second = decoder.decode(&bytes[3..]);
        assert_eq!(second, "ème brûlée");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn decoder_flushes_truncated_tail_lossily() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xE2, 0x82]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn pull_stream_forwards_chunks_in_order() {
        let response = pull_of(&[b"ab", b"cd", b"ef"]);
        let mut seen = Vec::new();
        let text = response.consume(&mut seen).await.unwrap();
        assert_eq!(text, "abcdef");
        assert_eq!(seen, vec!["ab", "cd", "ef"]);
    }

    #[tokio::test]
    async fn pull_stream_error_is_stream_failure() {
        let items: Vec<Result<Vec<u8>, StreamFailure>> = vec![
            Ok(b"{".to_vec()),
            Err(StreamFailure("connection reset".to_string())),
        ];
        let response = BackendResponse::Pull(stream::iter(items).boxed());
        let mut seen = Vec::new();
        let err = stream_recipe(response, &mut seen).await.unwrap_err();
        assert!(matches!(err, CoreError::Stream(StreamFailure(ref m)) if m == "connection reset"));
    }

    #[tokio::test]
    async fn push_channel_is_drained_until_end() {
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for part in PAYLOAD.as_bytes().chunks(7) {
                tx.send(StreamEvent::Data(part.to_vec())).await.unwrap();
            }
            tx.send(StreamEvent::End).await.unwrap();
        });
        let mut seen = Vec::new();
        let recipe = stream_recipe(BackendResponse::Push(rx), &mut seen).await.unwrap();
        assert_eq!(recipe.title, "Soup");
        assert_eq!(seen.concat(), PAYLOAD);
    }

    #[tokio::test]
    async fn push_channel_closed_without_end_still_completes() {
        let (tx, rx) = mpsc::channel(2);
        tx.send(StreamEvent::Data(PAYLOAD.as_bytes().to_vec())).await.unwrap();
        drop(tx);
        let mut seen = Vec::new();
        let recipe = stream_recipe(BackendResponse::Push(rx), &mut seen).await.unwrap();
        assert_eq!(recipe.ingredients, vec!["water", "salt"]);
    }

    #[tokio::test]
    async fn push_error_event_is_stream_failure() {
        let (tx, rx) = mpsc::channel(2);
        tx.send(StreamEvent::Data(b"partial".to_vec())).await.unwrap();
        tx.send(StreamEvent::Error("upstream closed".to_string())).await.unwrap();
        let mut seen = Vec::new();
        let err = BackendResponse::Push(rx).consume(&mut seen).await.unwrap_err();
        assert_eq!(err, StreamFailure("upstream closed".to_string()));
    }

    #[tokio::test]
    async fn buffered_text_is_forwarded_once() {
        let mut seen = Vec::new();
        let recipe = stream_recipe(BackendResponse::Buffered(PAYLOAD.to_string()), &mut seen)
            .await
            .unwrap();
        assert_eq!(seen, vec![PAYLOAD]);
        assert_eq!(recipe.prep_time, "5 minutes");
    }

    #[tokio::test]
    async fn failing_sink_does_not_stop_accumulation() {
        let mut calls = 0;
        let mut sink = sink_fn(|_chunk: &str| {
            calls += 1;
            Err(SinkError("client went away".to_string()))
        });
        let parts: Vec<&[u8]> = PAYLOAD.as_bytes().chunks(5).collect();
        let recipe = stream_recipe(pull_of(&parts), &mut sink).await.unwrap();
        assert_eq!(recipe.title, "Soup");
        drop(sink);
        assert_eq!(calls, parts.len());
    }

    #[tokio::test]
    async fn invalid_text_after_full_drain_is_parse_failure() {
        let mut seen = Vec::new();
        let err = stream_recipe(pull_of(&[b"Sorry, ", b"no recipe"]), &mut seen)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Parse(ref f) if f.raw == "Sorry, no recipe"));
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn channel_sink_reports_disconnect() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ChannelSink(tx);
        assert!(sink.send("x").is_err());
    }
}
