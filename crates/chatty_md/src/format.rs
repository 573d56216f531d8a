//! Markdown formatting for terminal output.

use std::fmt;

use comrak::{Arena, options::Extension};
use syntect::{highlighting::Theme, parsing::SyntaxSet};
use two_face::theme::EmbeddedThemeName;

use crate::render;

/// Default width of thematic breaks.
const DEFAULT_WIDTH: usize = 80;

/// The default syntax highlighting theme.
const DEFAULT_THEME: EmbeddedThemeName = EmbeddedThemeName::MonokaiExtended;

/// Themes that can be selected by name.
const THEMES: &[EmbeddedThemeName] = &[
    EmbeddedThemeName::Ansi,
    EmbeddedThemeName::Base16,
    EmbeddedThemeName::Dracula,
    EmbeddedThemeName::Github,
    EmbeddedThemeName::GruvboxDark,
    EmbeddedThemeName::GruvboxLight,
    EmbeddedThemeName::MonokaiExtended,
    EmbeddedThemeName::MonokaiExtendedLight,
    EmbeddedThemeName::Nord,
    EmbeddedThemeName::OneHalfDark,
    EmbeddedThemeName::OneHalfLight,
    EmbeddedThemeName::SolarizedDark,
    EmbeddedThemeName::SolarizedLight,
    EmbeddedThemeName::TwoDark,
    EmbeddedThemeName::Zenburn,
];

/// Turns a markdown source into text ready for the terminal.
pub trait Render {
    /// Render `text`.
    ///
    /// Returns an empty string when `text` holds nothing but whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the output fails.
    fn render(&self, text: &str) -> Result<String, fmt::Error>;
}

/// A formatter for markdown text.
pub struct Formatter {
    /// Width of thematic breaks.
    width: usize,

    /// Resolved syntax highlighting theme.
    theme: Theme,

    /// Syntax definitions for fenced code blocks.
    syntaxes: SyntaxSet,
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("width", &self.width)
            .field("theme", &self.theme.name)
            .finish_non_exhaustive()
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    /// Create a new formatter with the default width and theme.
    #[must_use]
    pub fn new() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            theme: resolve_theme(None),
            syntaxes: two_face::syntax::extra_newlines(),
        }
    }

    /// Set the width of thematic breaks.
    #[must_use]
    pub const fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Set the syntax highlighting theme by name.
    ///
    /// Unknown names fall back to the default theme.
    #[must_use]
    pub fn theme(mut self, name: &str) -> Self {
        self.theme = resolve_theme(Some(name));
        self
    }

    /// Format the markdown for terminal output.
    ///
    /// This injects ANSI escape codes into the text, to make markdown
    /// elements reflect their style (strong, italics, code, etc.).
    ///
    /// # Errors
    ///
    /// Returns an error if `fmt::Error` is returned when formatting the
    /// markdown.
    pub fn format_terminal(&self, text: &str) -> Result<String, fmt::Error> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let options = parse_options();
        let arena = Arena::new();
        let root = comrak::parse_document(&arena, text, &options);

        let mut buf = String::new();
        render::format_terminal(root, self.width, &self.theme, &self.syntaxes, &mut buf)?;

        Ok(buf)
    }
}

impl Render for Formatter {
    fn render(&self, text: &str) -> Result<String, fmt::Error> {
        self.format_terminal(text)
    }
}

/// Returns the comrak parse options used by the formatter.
fn parse_options() -> comrak::Options<'static> {
    comrak::Options {
        extension: Extension {
            strikethrough: true,
            autolink: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Resolve a theme by name, or fall back to the default.
fn resolve_theme(name: Option<&str>) -> Theme {
    let themes = two_face::theme::extra();
    let variant = name
        .and_then(|name| {
            THEMES
                .iter()
                .copied()
                .find(|variant| variant.as_name().eq_ignore_ascii_case(name))
        })
        .unwrap_or(DEFAULT_THEME);

    themes[variant].clone()
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
