//! The complete response filter: event decoding, delta extraction and tag
//! lexing, wired together.

use std::{io, pin::pin};

use futures::StreamExt as _;
use tokio::io::AsyncRead;
use tracing::{debug, trace};

use crate::{
    accumulator::Transcript,
    decoder::{self, DecoderConfig},
    delta,
    error::{Error, Result},
    lexer::{Event, TagLexer},
};

/// A consumer of lexer events, e.g. a terminal.
///
/// Events are delivered in stream order and must be treated as append-only
/// writes.
pub trait Sink {
    fn write(&mut self, event: &Event) -> io::Result<()>;
}

impl Sink for Vec<Event> {
    fn write(&mut self, event: &Event) -> io::Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, event: &Event) -> io::Result<()> {
        (**self).write(event)
    }
}

/// Runs a streamed completion body through the filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseFilter {
    config: DecoderConfig,
}

impl ResponseFilter {
    #[must_use]
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Filter the event stream read from `reader` into `sink`.
    ///
    /// Returns the [`Transcript`] once the stream terminates, either through
    /// the `[DONE]` sentinel or because the reader is exhausted.
    ///
    /// # Errors
    ///
    /// Fails on the first decode error or sink error. Events already written
    /// to the sink stay written.
    pub async fn run<R, S>(&self, reader: R, mut sink: S) -> Result<Transcript>
    where
        R: AsyncRead,
        S: Sink,
    {
        let mut payloads = pin!(decoder::decode(reader, self.config));
        let mut lexer = TagLexer::new();
        let mut frames = 0_usize;

        while let Some(payload) = payloads.next().await {
            let payload = payload?;
            frames += 1;

            let delta = delta::extract(&payload);
            trace!(frame = frames, bytes = delta.content.len(), "Received delta.");
            if delta.is_empty() {
                continue;
            }

            for event in lexer.feed(&delta.content) {
                sink.write(&event).map_err(Error::Sink)?;
            }
        }

        let (events, transcript) = lexer.finish();
        for event in &events {
            sink.write(event).map_err(Error::Sink)?;
        }

        debug!(
            frames,
            bytes = transcript.full_text.len(),
            reasoning = transcript.saw_any_delimiter,
            "Finished filtering response stream."
        );

        Ok(transcript)
    }

    /// Filter a complete, non-streamed reply into `sink`.
    ///
    /// # Errors
    ///
    /// Fails if the sink fails.
    pub fn run_text<S: Sink>(text: &str, mut sink: S) -> Result<Transcript> {
        let mut lexer = TagLexer::new();
        let mut events = lexer.feed(text);
        let (tail, transcript) = lexer.finish();
        events.extend(tail);

        for event in &events {
            sink.write(event).map_err(Error::Sink)?;
        }

        Ok(transcript)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
