//! Incremental decoding of newline-delimited JSON response bodies.
//!
//! The server emits one JSON object per line when streaming:
//! ```text
//! {"model":"llama3","message":{"role":"assistant","content":"Hello"},"done":false}
//! {"model":"llama3","message":{"role":"assistant","content":" world"},"done":false}
//! {"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}
//! ```
//! Lines arrive in arbitrary fragment sizes, so [`LineDecoder`] reassembles
//! them byte-wise before each one is parsed. Non-streaming bodies take the
//! single-shot [`decode_object`] path instead.

use std::io::Read;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parlor_types::ClientError;
use serde::de::DeserializeOwned;

/// Reassembles newline-terminated records from arbitrarily fragmented
/// input.
///
/// Bytes after the last newline stay buffered until more input arrives;
/// end-of-stream performs no partial trailing parse.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// New decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of input. Any fragment size is fine, down to a single
    /// byte.
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Drain the next complete line, without its terminator.
    ///
    /// A trailing `\r` is trimmed and blank lines are skipped. Returns
    /// `None` once no complete line remains buffered.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.iter().any(|b| !b.is_ascii_whitespace()) {
                return Some(line);
            }
        }
        None
    }

    /// Whether unterminated bytes remain buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

/// Decode one NDJSON line into its record type.
pub fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(line).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Decode a complete response body as a single JSON object.
pub fn decode_object<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Lazy sequence of decoded records over a still-open response body.
///
/// Yields one `Ok` per decoded line as bytes arrive. The first transport
/// or decode error is yielded once and terminates the sequence; there is
/// no resynchronization.
pub struct RecordStream<T> {
    inner: Pin<Box<dyn Stream<Item = Result<T, ClientError>> + Send>>,
}

impl<T> std::fmt::Debug for RecordStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream").finish_non_exhaustive()
    }
}

impl<T> Stream for RecordStream<T> {
    type Item = Result<T, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Wrap an incremental byte source into a [`RecordStream`].
pub(crate) fn record_stream<T, S>(byte_stream: S) -> RecordStream<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<Bytes, ClientError>> + Send + 'static,
{
    let records = async_stream::stream! {
        let mut decoder = LineDecoder::new();
        let mut bytes = std::pin::pin!(byte_stream);

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            decoder.feed(&chunk);
            while let Some(line) = decoder.next_line() {
                match decode_line(&line) {
                    Ok(record) => yield Ok(record),
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                }
            }
        }

        if decoder.has_partial() {
            tracing::trace!("discarding unterminated bytes at end of stream");
        }
    };
    RecordStream {
        inner: Box::pin(records),
    }
}

/// Blocking counterpart of [`RecordStream`]: a fused iterator reading the
/// body incrementally.
pub struct BlockingRecords<R, T> {
    reader: R,
    decoder: LineDecoder,
    finished: bool,
    _record: PhantomData<fn() -> T>,
}

impl<R: Read, T: DeserializeOwned> BlockingRecords<R, T> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: LineDecoder::new(),
            finished: false,
            _record: PhantomData,
        }
    }
}

impl<R: Read, T: DeserializeOwned> Iterator for BlockingRecords<R, T> {
    type Item = Result<T, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            if let Some(line) = self.decoder.next_line() {
                return match decode_line(&line) {
                    Ok(record) => Some(Ok(record)),
                    Err(err) => {
                        self.finished = true;
                        Some(Err(err))
                    }
                };
            }
            let mut chunk = [0u8; 512];
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.finished = true;
                    if self.decoder.has_partial() {
                        tracing::trace!("discarding unterminated bytes at end of body");
                    }
                    return None;
                }
                Ok(n) => self.decoder.feed(&chunk[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.finished = true;
                    return Some(Err(ClientError::Transport(Box::new(err))));
                }
            }
        }
    }
}
