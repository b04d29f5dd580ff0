//! Server-sent event decoding for streamed replies.
//!
//! The endpoint frames its reply as repeated `data: <payload>\n\n` blocks. The
//! payload is either the `[DONE]` sentinel or a slice of markdown whose line
//! breaks were escaped as `[NEWLINE]`. This module turns the raw byte stream of
//! the HTTP body into a stream of [`StreamEvent`]s, carrying partial UTF-8
//! sequences and partial events over read boundaries.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_EVENTS, STREAM_IGNORED_EVENTS};
use crate::{Error, Result};

/// Delimiter between events.
pub const EVENT_DELIMITER: &str = "\n\n";

/// Prefix an event must carry to be recognized.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that ends the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Placeholder the server substitutes for line breaks inside a payload.
pub const NEWLINE_PLACEHOLDER: &str = "[NEWLINE]";

/// A decoded event from the reply stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A markdown fragment, still carrying `[NEWLINE]` placeholders.
    Data(String),
    /// The `[DONE]` sentinel.
    Done,
}

impl StreamEvent {
    /// Classify a single event block, returning `None` for blocks without the
    /// `data: ` prefix.
    pub fn parse(block: &str) -> Option<Self> {
        let payload = block.strip_prefix(DATA_PREFIX)?;
        if payload == DONE_SENTINEL {
            Some(StreamEvent::Done)
        } else {
            Some(StreamEvent::Data(payload.to_string()))
        }
    }
}

/// Replace every `[NEWLINE]` placeholder with a line feed.
pub fn restore_newlines(payload: &str) -> String {
    payload.replace(NEWLINE_PLACEHOLDER, "\n")
}

/// Incremental decoder from body bytes to events.
///
/// Bytes are decoded the way a streaming text decoder would: an incomplete
/// trailing UTF-8 sequence waits for the next read and invalid bytes become
/// U+FFFD. Text is buffered until a `\n\n` delimiter closes an event.
#[derive(Debug, Default)]
pub struct EventDecoder {
    pending_bytes: Vec<u8>,
    buffer: String,
    finished: bool,
}

impl EventDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the `[DONE]` sentinel has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one read's worth of bytes and return the events it completed.
    ///
    /// Decoding stops at `[DONE]`: the sentinel is the last event returned and
    /// everything after it, in this read or any later one, is discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let text = self.decode(chunk);
        tracing::debug!(chunk = ?text, "raw chunk");
        self.buffer.push_str(&text);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find(EVENT_DELIMITER) {
            let block: String = self.buffer.drain(..end + EVENT_DELIMITER.len()).collect();
            let block = &block[..end];
            if self.accept(block, &mut events) {
                break;
            }
        }
        events
    }

    /// Flush whatever is left once the body has ended.
    ///
    /// A trailing event that never saw its delimiter is still delivered.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        if !self.pending_bytes.is_empty() {
            let tail = std::mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let block = std::mem::take(&mut self.buffer);
        let mut events = Vec::new();
        self.accept(&block, &mut events);
        self.finished = true;
        events
    }

    /// Classify one block; returns true when the stream is done.
    fn accept(&mut self, block: &str, events: &mut Vec<StreamEvent>) -> bool {
        if block.is_empty() {
            return false;
        }
        match StreamEvent::parse(block) {
            Some(StreamEvent::Done) => {
                STREAM_EVENTS.click();
                self.finished = true;
                self.buffer.clear();
                self.pending_bytes.clear();
                events.push(StreamEvent::Done);
                true
            }
            Some(event) => {
                STREAM_EVENTS.click();
                tracing::debug!(event = ?event, "received");
                events.push(event);
                false
            }
            None => {
                STREAM_IGNORED_EVENTS.click();
                tracing::debug!(block, "ignoring event without data prefix");
                false
            }
        }
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending_bytes.extend_from_slice(chunk);
        let split = incomplete_tail_start(&self.pending_bytes);
        let tail = self.pending_bytes.split_off(split);
        let text = String::from_utf8_lossy(&self.pending_bytes).into_owned();
        self.pending_bytes = tail;
        text
    }
}

/// Index at which a trailing, not yet complete UTF-8 sequence begins, or the
/// buffer length if the buffer ends on a character boundary.
fn incomplete_tail_start(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for idx in (len.saturating_sub(3)..len).rev() {
        let byte = bytes[idx];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if len - idx < needed { idx } else { len };
    }
    len
}

/// Process a stream of body bytes into a stream of events.
///
/// The returned stream yields every recognized event in order and ends right
/// after [`StreamEvent::Done`] or when the body ends. A transport failure is
/// yielded once as an error and ends the stream.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let ready: Vec<StreamEvent> = Vec::new();

    stream::unfold(
        (byte_stream, EventDecoder::new(), ready.into_iter(), false),
        |(mut byte_stream, mut decoder, mut ready, mut ended)| async move {
            loop {
                if let Some(event) = ready.next() {
                    return Some((Ok(event), (byte_stream, decoder, ready, ended)));
                }
                if ended || decoder.is_finished() {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        ready = decoder.push(&bytes).into_iter();
                    }
                    Some(Err(err)) => {
                        ended = true;
                        return Some((Err(err), (byte_stream, decoder, ready, ended)));
                    }
                    None => {
                        ended = true;
                        ready = decoder.finish().into_iter();
                    }
                }
            }
        },
    )
}

/// Adapt a reqwest body stream to the crate's error type.
pub fn map_body_errors<S>(body: S) -> impl Stream<Item = Result<Bytes>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>>,
{
    body.map(|result| result.map_err(|e| Error::streaming(e.to_string(), Some(Box::new(e)))))
}
