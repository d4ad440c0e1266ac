//! Newline-delimited JSON stream decoding.
//!
//! A game stream is an unbounded byte stream with one JSON record per line
//! and empty keep-alive lines in between. Bytes are buffered until a newline
//! arrives, so records and multi-byte characters split across chunks are
//! reassembled before decoding.

use super::messages::GameEvent;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;

/// Lazy sequence of typed events for one game
pub type EventStream = BoxStream<'static, GameEvent>;

/// Incremental line splitter and JSON decoder
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already scanned without finding a newline
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every complete record it finished.
    ///
    /// Blank lines are skipped and lines that are not valid JSON are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;

        while let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            if let Some(record) = decode_line(&self.buffer[start..end]) {
                records.push(record);
            }
            start = end + 1;
            search_from = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        records
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn decode_line(line: &[u8]) -> Option<Value> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => {
            log::trace!("Dropping non UTF-8 stream line: {}", e);
            return None;
        }
    };

    if text.is_empty() {
        return None;
    }

    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            log::trace!("Dropping malformed stream record: {}", e);
            None
        }
    }
}

struct DecodeState<S> {
    inner: std::pin::Pin<Box<S>>,
    decoder: LineDecoder,
    ready: VecDeque<Value>,
    done: bool,
}

/// Decode a chunked byte stream into JSON records.
///
/// The sequence ends when the byte stream ends or yields an error. A trailing
/// segment without a newline is dropped.
pub fn decode_records<S, B, E>(bytes: S) -> BoxStream<'static, Value>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(record) = state.ready.pop_front() {
                return Some((record, state));
            }
            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let records = state.decoder.push(chunk.as_ref());
                    state.ready.extend(records);
                }
                Some(Err(e)) => {
                    log::warn!("Event stream failed: {}", e);
                    state.done = true;
                }
                None => {
                    if state.decoder.pending() > 0 {
                        log::debug!(
                            "Event stream closed with {} undelimited bytes",
                            state.decoder.pending()
                        );
                    }
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

/// Decode a chunked byte stream into typed game events.
///
/// Records without a usable `type` are dropped.
pub fn decode_events<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    decode_records(bytes)
        .filter_map(|record| async move { GameEvent::from_record(record) })
        .boxed()
}
