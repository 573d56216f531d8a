//! Live terminal output of a reply.

use std::io::{self, Write};

use chatty_stream::{Event, Sink};
use crossterm::style::Stylize as _;

/// Writes reply events to a terminal as they arrive.
///
/// Reasoning is shown faint magenta when colors are enabled, everything else
/// is written as-is. Each event is flushed immediately.
pub(crate) struct Printer<W> {
    out: W,
    colors: bool,

    /// The last byte written was a newline, or nothing was written yet.
    at_line_start: bool,
}

impl<W: Write> Printer<W> {
    pub(crate) fn new(out: W, colors: bool) -> Self {
        Self {
            out,
            colors,
            at_line_start: true,
        }
    }

    /// End the reply on its own line.
    pub(crate) fn finish(mut self) -> io::Result<()> {
        if !self.at_line_start {
            self.out.write_all(b"\n")?;
        }

        self.out.flush()
    }
}

impl<W: Write> Sink for Printer<W> {
    fn write(&mut self, event: &Event) -> io::Result<()> {
        let Some(text) = event.as_text() else {
            return Ok(());
        };

        if text.is_empty() {
            return Ok(());
        }

        if event.is_reasoning() && self.colors {
            write!(self.out, "{}", text.magenta().dim())?;
        } else {
            self.out.write_all(text.as_bytes())?;
        }

        self.at_line_start = text.ends_with('\n');
        self.out.flush()
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
