//! Incremental filtering of streamed chat completion replies.
//!
//! A reply arrives as a server-sent event body. The [`decoder`] splits it into
//! `data:` payloads, the [`delta`] extractor pulls the content increment out
//! of each payload, and the [`TagLexer`] classifies the increments into
//! visible and reasoning text, in real time. [`ResponseFilter`] wires the
//! stages together.

pub mod accumulator;
pub mod decoder;
pub mod delta;
mod error;
pub mod filter;
pub mod lexer;

pub use accumulator::{StreamAccumulator, Transcript};
pub use decoder::{DecoderConfig, EventCodec, RawFrame};
pub use delta::Delta;
pub use error::{DecodeError, Error};
pub use filter::{ResponseFilter, Sink};
pub use lexer::{Event, Mode, TagLexer};
