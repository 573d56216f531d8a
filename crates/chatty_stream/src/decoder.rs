//! Line-oriented decoding of server-sent event bodies.
//!
//! The decoder turns the raw response body of a streaming completion request
//! into the payloads of its `data: ` lines. Everything else on the wire
//! (comments, keep-alives, `event:` lines) is framing noise and is skipped.

use std::pin::pin;

use async_stream::stream;
use futures::{Stream, StreamExt as _};
use tokio::io::AsyncRead;
use tokio_util::{
    bytes::BytesMut,
    codec::{Decoder, FramedRead},
};
use tracing::{debug, trace};

use crate::error::DecodeError;

/// Prefix of a line that carries an event payload.
const DATA_PREFIX: &str = "data: ";

/// Payload marking the end of the event stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Default maximum length of a single event line (64 KiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum number of bytes in a single line, excluding the `\n`.
    ///
    /// Exceeding this limit is fatal to the stream.
    pub max_line_length: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// A single decoded line of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// A line without the `data: ` prefix.
    Ignored,

    /// The payload of a `data: ` line.
    Data(String),

    /// The `[DONE]` termination sentinel.
    Done,
}

impl RawFrame {
    fn from_line(line: &str) -> Self {
        match line.strip_prefix(DATA_PREFIX) {
            Some(DONE_SENTINEL) => Self::Done,
            Some(payload) => Self::Data(payload.to_owned()),
            None => Self::Ignored,
        }
    }
}

/// A [`Decoder`] that splits a byte stream into [`RawFrame`]s on `\n`.
///
/// A `\r` preceding the `\n` is stripped. Unlike `LinesCodec`, an unterminated
/// trailing line at end-of-stream is discarded instead of yielded, as it can
/// never be a complete event.
#[derive(Debug, Clone)]
pub struct EventCodec {
    max_line_length: usize,

    /// Index into the buffer up to which we know there is no `\n`.
    next_index: usize,
}

impl EventCodec {
    #[must_use]
    pub fn new(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
        }
    }

    #[must_use]
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Default for EventCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl Decoder for EventCodec {
    type Item = RawFrame;
    type Error = DecodeError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<RawFrame>, DecodeError> {
        let Some(offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') else {
            // The line is at least as long as what we have buffered so far.
            if buf.len() > self.max_line_length {
                return Err(DecodeError::LineTooLong {
                    limit: self.max_line_length,
                });
            }

            self.next_index = buf.len();
            return Ok(None);
        };

        let newline_index = self.next_index + offset;
        self.next_index = 0;

        if newline_index > self.max_line_length {
            return Err(DecodeError::LineTooLong {
                limit: self.max_line_length,
            });
        }

        let line = buf.split_to(newline_index + 1);
        let line = &line[..newline_index];
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        Ok(Some(RawFrame::from_line(std::str::from_utf8(line)?)))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<RawFrame>, DecodeError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }

        if !buf.is_empty() {
            debug!(bytes = buf.len(), "Discarding unterminated trailing line.");
            buf.clear();
        }

        self.next_index = 0;
        Ok(None)
    }
}

/// Decode the event payloads of a response body.
///
/// The returned stream yields the payload of every `data: ` line, in order.
/// It ends when the `[DONE]` sentinel is seen (without reading any further
/// from `reader`), when the reader is exhausted, or after yielding the first
/// error.
pub fn decode<R>(reader: R, config: DecoderConfig) -> impl Stream<Item = Result<String, DecodeError>>
where
    R: AsyncRead,
{
    stream! {
        let mut frames = pin!(FramedRead::new(reader, EventCodec::new(config.max_line_length)));

        while let Some(frame) = frames.next().await {
            match frame {
                Ok(RawFrame::Data(payload)) => yield Ok(payload),
                Ok(RawFrame::Ignored) => trace!("Skipping non-data line."),
                Ok(RawFrame::Done) => {
                    trace!("Received end-of-stream sentinel.");
                    break;
                }
                Err(error) => {
                    yield Err(error);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "decoder_tests.rs"]
mod tests;
