//! Tag-aware lexing of a streamed reply.
//!
//! Some models wrap their chain of thought in `<think>…</think>` (or
//! `<thinking>…</thinking>`) before answering. The [`TagLexer`] consumes the
//! reply in whatever chunks the network delivers and classifies every byte as
//! either [`Event::Visible`] or [`Event::Reasoning`]. Delimiters may be split
//! across chunk boundaries at any byte; text that might still turn out to be
//! the start of a delimiter is held back until the next chunk decides it.
//!
//! The lexer never drops, duplicates or reorders input: concatenating the text
//! of all emitted events yields exactly the text that was fed, no matter how
//! it was chunked.

use std::mem;

use tracing::{debug, trace};

use crate::accumulator::{StreamAccumulator, Transcript};

/// The delimiters recognized by the lexer.
const THINK_TAGS: TagPattern = TagPattern {
    open: &["<think>", "<thinking>"],
    close: &["</think>", "</thinking>"],
};

/// The classification of the text currently being lexed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Regular reply text.
    #[default]
    Normal,

    /// Text inside a reasoning block.
    Reasoning,
}

impl Mode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Normal => Self::Reasoning,
            Self::Reasoning => Self::Normal,
        }
    }
}

/// An output event of the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Regular reply text.
    Visible(String),

    /// Reasoning text, including the delimiters that enclose it.
    Reasoning(String),

    /// The lexer switched modes.
    ModeChange { from: Mode, to: Mode },
}

impl Event {
    fn text(mode: Mode, text: &str) -> Self {
        match mode {
            Mode::Normal => Self::Visible(text.to_owned()),
            Mode::Reasoning => Self::Reasoning(text.to_owned()),
        }
    }

    /// The text carried by this event, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Visible(text) | Self::Reasoning(text) => Some(text),
            Self::ModeChange { .. } => None,
        }
    }

    #[must_use]
    pub fn is_reasoning(&self) -> bool {
        matches!(self, Self::Reasoning(_))
    }
}

/// A fixed set of literal open and close delimiters.
#[derive(Debug, Clone, Copy)]
struct TagPattern {
    open: &'static [&'static str],
    close: &'static [&'static str],
}

impl TagPattern {
    /// The delimiters that can end the given mode.
    fn delimiters(&self, mode: Mode) -> &'static [&'static str] {
        match mode {
            Mode::Normal => self.open,
            Mode::Reasoning => self.close,
        }
    }

    /// Find the earliest delimiter that ends `mode` in `haystack`.
    fn find(&self, mode: Mode, haystack: &str) -> Option<(usize, &'static str)> {
        self.delimiters(mode)
            .iter()
            .filter_map(|tag| haystack.find(tag).map(|index| (index, *tag)))
            .min_by_key(|(index, _)| *index)
    }

    /// Length of the longest suffix of `haystack` that is a proper prefix of
    /// a delimiter ending `mode`.
    ///
    /// Assumes `haystack` contains no complete delimiter for `mode`.
    fn partial_suffix_len(&self, mode: Mode, haystack: &str) -> usize {
        let tags = self.delimiters(mode);
        let longest = tags.iter().map(|tag| tag.len()).max().unwrap_or_default();
        let limit = longest.saturating_sub(1).min(haystack.len());

        (1..=limit)
            .rev()
            .find(|&len| {
                let start = haystack.len() - len;
                haystack.is_char_boundary(start)
                    && tags.iter().any(|tag| tag.starts_with(&haystack[start..]))
            })
            .unwrap_or_default()
    }
}

/// An incremental lexer that separates reasoning from reply text.
///
/// Create one lexer per streamed reply, [`feed`](Self::feed) it every content
/// increment in arrival order, and call [`finish`](Self::finish) once the
/// stream has ended.
#[derive(Debug, Default)]
pub struct TagLexer {
    mode: Mode,

    /// Unemitted tail of the input that may still grow into a delimiter.
    lookback: String,

    accumulator: StreamAccumulator,
}

impl TagLexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Text held back because it might be the start of a delimiter.
    #[must_use]
    pub fn lookback(&self) -> &str {
        &self.lookback
    }

    #[must_use]
    pub fn accumulator(&self) -> &StreamAccumulator {
        &self.accumulator
    }

    /// Process the next content increment.
    ///
    /// Returns the events that can be emitted with certainty, in order.
    pub fn feed(&mut self, delta: &str) -> Vec<Event> {
        self.accumulator.push_input(delta);

        let mut buffer = mem::take(&mut self.lookback);
        buffer.push_str(delta);

        let mut events = vec![];
        let mut rest = buffer.as_str();

        // A single chunk can contain any number of complete delimiters.
        while let Some((index, tag)) = THINK_TAGS.find(self.mode, rest) {
            push_text(&mut events, self.mode, &rest[..index]);

            let from = self.mode;
            let to = from.toggled();
            trace!(?from, ?to, tag, "Matched reasoning delimiter.");

            match from {
                Mode::Normal => {
                    events.push(Event::ModeChange { from, to });
                    events.push(Event::Reasoning(tag.to_owned()));
                }
                Mode::Reasoning => {
                    events.push(Event::Reasoning(tag.to_owned()));
                    events.push(Event::ModeChange { from, to });
                }
            }

            self.mode = to;
            rest = &rest[index + tag.len()..];
        }

        let retain = THINK_TAGS.partial_suffix_len(self.mode, rest);
        let (emit, lookback) = rest.split_at(rest.len() - retain);
        push_text(&mut events, self.mode, emit);
        self.lookback = lookback.to_owned();

        self.observe(&events);
        events
    }

    /// End the stream.
    ///
    /// Any held-back text can no longer complete a delimiter, so it is
    /// emitted in the current mode. Returns the final events and the
    /// [`Transcript`] of the stream.
    #[must_use]
    pub fn finish(mut self) -> (Vec<Event>, Transcript) {
        let mut events = vec![];
        let lookback = mem::take(&mut self.lookback);
        push_text(&mut events, self.mode, &lookback);
        self.observe(&events);

        if self.mode == Mode::Reasoning {
            debug!("Stream ended inside an unclosed reasoning block.");
        }

        (events, self.accumulator.into_transcript())
    }

    fn observe(&mut self, events: &[Event]) {
        for event in events {
            self.accumulator.observe(event);
        }
    }
}

fn push_text(events: &mut Vec<Event>, mode: Mode, text: &str) {
    if !text.is_empty() {
        events.push(Event::text(mode, text));
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
