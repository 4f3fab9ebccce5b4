//! The streaming generation envelope.
//!
//! A streamed generation is a run of raw preview chunks followed by a single
//! terminal marker, `\n[FINAL_JSON]`, and the JSON-serialized final record.
//! Nothing follows the JSON.

use crate::error::ParseFailure;
use crate::recipe::RecipeRecord;
use crate::streaming::Utf8Decoder;

/// The literal scanned for by consumers.
pub const FINAL_JSON_TAG: &str = "[FINAL_JSON]";
/// What producers write in front of the final record.
pub const FINAL_JSON_MARKER: &str = "\n[FINAL_JSON]";

/// Terminal frame of a successful streamed generation.
pub fn final_marker(record: &RecipeRecord) -> Result<String, serde_json::Error> {
    Ok(format!("{}{}", FINAL_JSON_MARKER, serde_json::to_string(record)?))
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeOutcome {
    /// The marker was seen and the record after it parsed.
    Final(RecipeRecord),
    /// The stream ended without a marker; the whole accumulation as text.
    PlainText(String),
}

/// Client-side reader of an envelope arriving in byte chunks.
///
/// Preview text is released as soon as it can no longer be the start of the
/// marker, so a marker split across chunks never leaks into the preview.
#[derive(Debug, Default)]
pub struct EnvelopeReader {
    decoder: Utf8Decoder,
    buffer: String,
    released: usize,
    marker_at: Option<usize>,
}

impl EnvelopeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns the preview text that became displayable.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        let text = self.decoder.decode(bytes);
        self.push_text(&text)
    }

    fn push_text(&mut self, text: &str) -> String {
        self.buffer.push_str(text);
        if self.marker_at.is_some() {
            return String::new();
        }

        let pending = &self.buffer[self.released..];
        if let Some(offset) = pending.find(FINAL_JSON_TAG) {
            let preview = pending[..offset].to_string();
            self.released += offset;
            self.marker_at = Some(self.released);
            return preview;
        }

        let held = partial_tag_suffix(pending);
        let ready = pending.len() - held;
        let preview = pending[..ready].to_string();
        self.released += ready;
        preview
    }

    pub fn saw_marker(&self) -> bool {
        self.marker_at.is_some()
    }

    /// Ends the stream and yields the authoritative record, or the plain
    /// accumulation when no marker arrived.
    pub fn finish(mut self) -> Result<EnvelopeOutcome, ParseFailure> {
        let rest = self.decoder.finish();
        self.push_text(&rest);

        match self.marker_at {
            Some(at) => {
                let json = self.buffer[at + FINAL_JSON_TAG.len()..].trim();
                serde_json::from_str(json)
                    .map(EnvelopeOutcome::Final)
                    .map_err(|e| ParseFailure::new(e.to_string(), json))
            }
            None => Ok(EnvelopeOutcome::PlainText(self.buffer)),
        }
    }
}

/// Reads a complete envelope held in memory.
pub fn read_envelope(text: &str) -> Result<EnvelopeOutcome, ParseFailure> {
    let mut reader = EnvelopeReader::new();
    reader.push_text(text);
    reader.finish()
}

/// Length of the longest suffix of `text` that is a proper prefix of the tag.
fn partial_tag_suffix(text: &str) -> usize {
    (1..FINAL_JSON_TAG.len())
        .rev()
        .find(|&len| text.ends_with(&FINAL_JSON_TAG[..len]))
        .unwrap_or(0)
}
