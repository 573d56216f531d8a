use crate::lexer::{Event, Mode};

/// Records everything a lexer received and emitted during one stream.
///
/// The full text is the exact concatenation of all deltas fed to the lexer.
/// The post-reasoning text collects every `Visible` span emitted after the
/// first closing delimiter, which is the part of the reply worth re-rendering
/// once the stream ends.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    full_text: String,
    post_reasoning_text: String,
    saw_any_delimiter: bool,
    closed_any_delimiter: bool,
}

impl StreamAccumulator {
    /// Record a raw delta, exactly as received.
    pub fn push_input(&mut self, delta: &str) {
        self.full_text.push_str(delta);
    }

    /// Record an event emitted by the lexer.
    pub fn observe(&mut self, event: &Event) {
        match event {
            Event::Visible(text) if self.closed_any_delimiter => {
                self.post_reasoning_text.push_str(text);
            }
            Event::ModeChange {
                to: Mode::Reasoning,
                ..
            } => self.saw_any_delimiter = true,
            Event::ModeChange { to: Mode::Normal, .. } => self.closed_any_delimiter = true,
            _ => {}
        }
    }

    #[must_use]
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    #[must_use]
    pub fn post_reasoning_text(&self) -> &str {
        &self.post_reasoning_text
    }

    #[must_use]
    pub fn saw_any_delimiter(&self) -> bool {
        self.saw_any_delimiter
    }

    #[must_use]
    pub fn into_transcript(self) -> Transcript {
        Transcript {
            full_text: self.full_text,
            post_reasoning_text: self.post_reasoning_text,
            saw_any_delimiter: self.saw_any_delimiter,
            closed_any_delimiter: self.closed_any_delimiter,
        }
    }
}

/// The final state of a filtered stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    /// Every byte received, in arrival order, regardless of mode.
    pub full_text: String,

    /// All `Visible` output emitted after the first closing delimiter.
    pub post_reasoning_text: String,

    /// Whether an opening delimiter was ever matched.
    pub saw_any_delimiter: bool,

    /// Whether a closing delimiter was ever matched.
    pub closed_any_delimiter: bool,
}

impl Transcript {
    /// The text eligible for a second-pass rich render.
    ///
    /// If the reply contained a reasoning block, only what followed it is
    /// eligible. An unclosed reasoning block therefore yields an empty string.
    #[must_use]
    pub fn render_source(&self) -> &str {
        if self.saw_any_delimiter {
            &self.post_reasoning_text
        } else {
            &self.full_text
        }
    }
}
