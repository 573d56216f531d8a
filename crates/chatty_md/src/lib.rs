//! Terminal rendering of markdown replies.

mod ansi;
mod format;
mod render;

pub use format::{Formatter, Render};
