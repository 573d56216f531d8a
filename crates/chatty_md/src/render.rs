//! ANSI-styled terminal renderer for CommonMark ASTs.
//!
//! Walks a comrak AST and produces CommonMark-like output with inline ANSI
//! escape codes for terminal styling. Markdown delimiters are kept in place
//! and styled, so the rendered reply still reads as the source it came from.
//!
//! Lines are not wrapped. Block structure (quotes, list items) is carried by a
//! per-line prefix that is re-emitted after every line break.

use std::{
    cmp::max,
    fmt::{self, Write},
};

use comrak::{
    Node,
    nodes::{ListDelimType, ListType, NodeCodeBlock, NodeLink, NodeList, NodeValue},
};
use syntect::{
    easy::HighlightLines,
    highlighting::Theme,
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};

use crate::ansi::{
    BOLD_END, BOLD_START, CODE_START, FAINT_END, FAINT_START, FG_END, ITALIC_END, ITALIC_START,
    QUOTE_PREFIX, RESET, STRIKETHROUGH_END, STRIKETHROUGH_START, UNDERLINE_END, UNDERLINE_START,
};

/// Format a comrak AST as styled terminal output.
pub(crate) fn format_terminal(
    root: Node<'_>,
    width: usize,
    theme: &Theme,
    syntaxes: &SyntaxSet,
    output: &mut dyn Write,
) -> fmt::Result {
    TerminalFormatter::new(width, theme, syntaxes, output).format(root)
}

/// Line-oriented output with block prefixes and deferred blank lines.
struct LineWriter<'w> {
    output: &'w mut dyn Write,

    /// Written at the start of every line.
    prefix: String,

    /// Prefix lengths to restore when leaving a block.
    prefix_stack: Vec<usize>,

    /// Nothing has been written on the current line yet.
    at_line_start: bool,

    /// A blank line is owed before the next content.
    pending_blank: bool,

    /// Any content has been written.
    started: bool,
}

impl<'w> LineWriter<'w> {
    fn new(output: &'w mut dyn Write) -> Self {
        Self {
            output,
            prefix: String::new(),
            prefix_stack: vec![],
            at_line_start: true,
            pending_blank: false,
            started: false,
        }
    }

    fn push_prefix(&mut self, segment: &str) {
        self.prefix_stack.push(self.prefix.len());
        self.prefix.push_str(segment);
    }

    fn pop_prefix(&mut self) {
        if let Some(len) = self.prefix_stack.pop() {
            self.prefix.truncate(len);
        }
    }

    /// Start the current line if needed, settling any owed blank line first.
    fn begin_line(&mut self) -> fmt::Result {
        if !self.at_line_start {
            return Ok(());
        }

        if self.pending_blank && self.started {
            self.output.write_str(self.prefix.trim_end())?;
            self.output.write_char('\n')?;
        }

        self.output.write_str(&self.prefix)?;
        self.pending_blank = false;
        self.at_line_start = false;
        self.started = true;

        Ok(())
    }

    /// Write text, re-emitting the prefix after every embedded newline.
    fn text(&mut self, text: &str) -> fmt::Result {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline()?;
            }

            if !line.is_empty() {
                self.begin_line()?;
                self.output.write_str(line)?;
            }
        }

        Ok(())
    }

    /// Write an escape sequence that styles upcoming content.
    fn open(&mut self, escape: &str) -> fmt::Result {
        self.begin_line()?;
        self.output.write_str(escape)
    }

    /// Write without touching line state.
    fn raw(&mut self, text: &str) -> fmt::Result {
        self.output.write_str(text)
    }

    fn newline(&mut self) -> fmt::Result {
        if self.at_line_start && self.started {
            self.output.write_str(self.prefix.trim_end())?;
        }

        self.output.write_char('\n')?;
        self.at_line_start = true;

        Ok(())
    }

    fn cr(&mut self) -> fmt::Result {
        if self.at_line_start {
            return Ok(());
        }

        self.newline()
    }

    fn blankline(&mut self) -> fmt::Result {
        self.cr()?;
        self.pending_blank = true;

        Ok(())
    }
}

/// Walks the AST and drives a [`LineWriter`].
struct TerminalFormatter<'w> {
    writer: LineWriter<'w>,

    /// Width of thematic breaks.
    width: usize,

    theme: &'w Theme,
    syntaxes: &'w SyntaxSet,

    /// Next number for each open ordered list.
    ol_stack: Vec<usize>,

    /// Open nodes that want bold text (headings and strong emphasis).
    bold_depth: usize,
}

impl<'w> TerminalFormatter<'w> {
    fn new(
        width: usize,
        theme: &'w Theme,
        syntaxes: &'w SyntaxSet,
        output: &'w mut dyn Write,
    ) -> Self {
        Self {
            writer: LineWriter::new(output),
            width,
            theme,
            syntaxes,
            ol_stack: vec![],
            bold_depth: 0,
        }
    }

    fn format(&mut self, root: Node<'_>) -> fmt::Result {
        enum Phase {
            Pre,
            Post,
        }

        let mut stack = vec![(root, Phase::Pre)];
        while let Some((node, phase)) = stack.pop() {
            match phase {
                Phase::Pre => {
                    if self.format_node(node, true)? {
                        stack.push((node, Phase::Post));
                        for child in node.reverse_children() {
                            stack.push((child, Phase::Pre));
                        }
                    }
                }
                Phase::Post => {
                    self.format_node(node, false)?;
                }
            }
        }

        self.writer.cr()
    }

    /// Format a single node (entering or exiting).
    ///
    /// Returns `true` if children should be visited.
    fn format_node(&mut self, node: Node<'_>, entering: bool) -> Result<bool, fmt::Error> {
        match node.data().value {
            NodeValue::BlockQuote => self.format_block_quote(entering)?,
            NodeValue::List(ref nl) => self.format_list(node, nl, entering)?,
            NodeValue::Item(..) => self.format_item(node, entering)?,
            NodeValue::Heading(ref nh) => self.format_heading(nh.level, entering)?,
            NodeValue::CodeBlock(ref ncb) => self.format_code_block(node, ncb, entering)?,
            NodeValue::HtmlBlock(ref nhb) => {
                if entering {
                    self.writer.text(nhb.literal.trim_end())?;
                    self.writer.blankline()?;
                }
            }
            NodeValue::ThematicBreak => self.format_thematic_break(entering)?,
            NodeValue::Paragraph => self.format_paragraph(node, entering)?,
            NodeValue::Text(ref literal) => {
                if entering {
                    self.writer.text(literal)?;
                }
            }
            NodeValue::HtmlInline(ref literal) => {
                if entering {
                    self.writer.text(literal)?;
                }
            }
            NodeValue::SoftBreak | NodeValue::LineBreak => {
                if entering {
                    self.writer.newline()?;
                }
            }
            NodeValue::Code(ref code) => self.format_code(&code.literal, entering)?,
            NodeValue::Strong => self.format_strong(entering)?,
            NodeValue::Emph => self.format_styled("*", ITALIC_START, ITALIC_END, entering)?,
            NodeValue::Strikethrough => {
                self.format_styled("~~", STRIKETHROUGH_START, STRIKETHROUGH_END, entering)?;
            }
            NodeValue::Link(ref nl) => return self.format_link(node, nl, entering),
            NodeValue::Image(ref nl) => self.format_image(nl, entering)?,
            _ => {}
        }

        Ok(true)
    }

    fn format_block_quote(&mut self, entering: bool) -> fmt::Result {
        if entering {
            self.writer.push_prefix(QUOTE_PREFIX);
            return Ok(());
        }

        self.writer.pop_prefix();
        self.writer.blankline()
    }

    fn format_list(&mut self, node: Node<'_>, list: &NodeList, entering: bool) -> fmt::Result {
        let ordered = list.list_type == ListType::Ordered;

        if entering {
            if ordered {
                self.ol_stack.push(list.start);
            }

            return Ok(());
        }

        if ordered {
            self.ol_stack.pop();
        }

        // Nested lists continue their parent item.
        if node
            .parent()
            .is_some_and(|p| matches!(p.data().value, NodeValue::Item(..)))
        {
            self.writer.cr()
        } else {
            self.writer.blankline()
        }
    }

    fn format_item(&mut self, node: Node<'_>, entering: bool) -> fmt::Result {
        if !entering {
            self.writer.pop_prefix();
            return self.writer.cr();
        }

        let Some(list) = node.parent().and_then(|p| match p.data().value {
            NodeValue::List(ref nl) => Some(*nl),
            _ => None,
        }) else {
            return Ok(());
        };

        let marker = match list.list_type {
            ListType::Bullet => "- ".to_owned(),
            ListType::Ordered => {
                let number = self.ol_stack.last_mut().map_or(list.start, |next| {
                    let n = *next;
                    *next += 1;
                    n
                });
                let delim = if list.delimiter == ListDelimType::Paren {
                    ")"
                } else {
                    "."
                };

                format!("{number}{delim} ")
            }
        };

        self.writer.text(&marker)?;
        self.writer.push_prefix(&" ".repeat(marker.chars().count()));

        Ok(())
    }

    fn format_heading(&mut self, level: u8, entering: bool) -> fmt::Result {
        if entering {
            self.writer
                .text(&format!("{} ", "#".repeat(usize::from(level))))?;
            return self.enter_bold();
        }

        self.exit_bold()?;
        self.writer.blankline()
    }

    fn format_code_block(
        &mut self,
        node: Node<'_>,
        ncb: &NodeCodeBlock,
        entering: bool,
    ) -> fmt::Result {
        if !entering {
            return Ok(());
        }

        let first_in_list_item = node.previous_sibling().is_none()
            && node
                .parent()
                .is_some_and(|p| matches!(p.data().value, NodeValue::Item(..)));

        if !first_in_list_item {
            self.writer.blankline()?;
        }

        let fence = "`".repeat(max(3, longest_run(&ncb.literal, '`') + 1));

        self.writer.open(FAINT_START)?;
        self.writer.text(&fence)?;
        self.writer.text(&ncb.info)?;
        self.writer.raw(FAINT_END)?;
        self.writer.newline()?;

        let language = ncb.info.split_whitespace().next().unwrap_or_default();
        self.format_code_lines(&ncb.literal, language)?;

        self.writer.open(FAINT_START)?;
        self.writer.text(&fence)?;
        self.writer.raw(FAINT_END)?;
        self.writer.blankline()
    }

    /// Write code block content, highlighted when the language is known.
    fn format_code_lines(&mut self, literal: &str, language: &str) -> fmt::Result {
        let mut highlighter = (!language.is_empty())
            .then(|| self.syntaxes.find_syntax_by_token(language))
            .flatten()
            .map(|syntax| HighlightLines::new(syntax, self.theme));

        for line in LinesWithEndings::from(literal) {
            self.writer.begin_line()?;

            let ranges = highlighter
                .as_mut()
                .and_then(|h| h.highlight_line(line, self.syntaxes).ok());

            if let Some(ranges) = ranges {
                let escaped = as_24_bit_terminal_escaped(&ranges, false);
                self.writer.raw(escaped.trim_end_matches(['\n', '\r']))?;
                self.writer.raw(RESET)?;
            } else {
                self.writer.raw(line.trim_end_matches(['\n', '\r']))?;
            }

            self.writer.newline()?;
        }

        Ok(())
    }

    fn format_thematic_break(&mut self, entering: bool) -> fmt::Result {
        if !entering {
            return Ok(());
        }

        self.writer.blankline()?;
        self.writer.open(FAINT_START)?;
        self.writer.text(&"─".repeat(self.width.max(1)))?;
        self.writer.raw(FAINT_END)?;
        self.writer.blankline()
    }

    fn format_paragraph(&mut self, node: Node<'_>, entering: bool) -> fmt::Result {
        if entering {
            return Ok(());
        }

        if in_tight_list_item(node) {
            self.writer.cr()
        } else {
            self.writer.blankline()
        }
    }

    fn format_code(&mut self, literal: &str, entering: bool) -> fmt::Result {
        if !entering {
            return Ok(());
        }

        self.writer.open(CODE_START)?;
        self.writer.text("`")?;
        self.writer.text(literal)?;
        self.writer.text("`")?;
        self.writer.raw(FG_END)
    }

    fn format_strong(&mut self, entering: bool) -> fmt::Result {
        if entering {
            self.enter_bold()?;
            return self.writer.text("**");
        }

        self.writer.text("**")?;
        self.exit_bold()
    }

    fn enter_bold(&mut self) -> fmt::Result {
        self.bold_depth += 1;
        if self.bold_depth == 1 {
            self.writer.open(BOLD_START)?;
        }

        Ok(())
    }

    fn exit_bold(&mut self) -> fmt::Result {
        self.bold_depth = self.bold_depth.saturating_sub(1);
        if self.bold_depth == 0 {
            self.writer.raw(BOLD_END)?;
        }

        Ok(())
    }

    /// Inline styling wrapped around the original delimiters.
    fn format_styled(
        &mut self,
        delimiter: &str,
        start: &str,
        end: &str,
        entering: bool,
    ) -> fmt::Result {
        if entering {
            self.writer.open(start)?;
            return self.writer.text(delimiter);
        }

        self.writer.text(delimiter)?;
        self.writer.raw(end)
    }

    fn format_link(
        &mut self,
        node: Node<'_>,
        nl: &NodeLink,
        entering: bool,
    ) -> Result<bool, fmt::Error> {
        if is_autolink(node, nl) {
            if entering {
                self.writer.open(UNDERLINE_START)?;
                self.writer
                    .text(nl.url.strip_prefix("mailto:").unwrap_or(&nl.url))?;
                self.writer.raw(UNDERLINE_END)?;
            }

            return Ok(false);
        }

        if entering {
            self.writer.text("[")?;
            self.writer.open(UNDERLINE_START)?;
        } else {
            self.writer.raw(UNDERLINE_END)?;
            self.writer.text("](")?;
            self.writer.text(&nl.url)?;
            self.writer.text(")")?;
        }

        Ok(true)
    }

    fn format_image(&mut self, nl: &NodeLink, entering: bool) -> fmt::Result {
        if entering {
            return self.writer.text("![");
        }

        self.writer.text("](")?;
        self.writer.text(&nl.url)?;
        self.writer.text(")")
    }
}

/// Whether a paragraph sits directly in an item of a tight list.
fn in_tight_list_item(node: Node<'_>) -> bool {
    node.parent()
        .filter(|p| matches!(p.data().value, NodeValue::Item(..)))
        .and_then(|item| item.parent())
        .is_some_and(|list| {
            matches!(
                list.data().value,
                NodeValue::List(NodeList { tight: true, .. })
            )
        })
}

/// A link whose only content is its own URL.
fn is_autolink(node: Node<'_>, nl: &NodeLink) -> bool {
    if nl.url.is_empty() || !nl.title.is_empty() {
        return false;
    }

    let Some(child) = node.first_child() else {
        return false;
    };

    if child.next_sibling().is_some() {
        return false;
    }

    let url = nl.url.strip_prefix("mailto:").unwrap_or(&nl.url);
    match child.data().value {
        NodeValue::Text(ref literal) => &**literal == url,
        _ => false,
    }
}

/// Length of the longest run of `needle` in `text`.
fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    longest
}
