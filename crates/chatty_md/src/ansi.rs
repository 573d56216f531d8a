//! ANSI SGR escape constants.

/// SGR: Bold on.
pub const BOLD_START: &str = "\x1b[1m";

/// SGR: Bold (and faint) off.
pub const BOLD_END: &str = "\x1b[22m";

/// SGR: Faint on.
pub const FAINT_START: &str = "\x1b[2m";

/// SGR: Faint (and bold) off.
pub const FAINT_END: &str = "\x1b[22m";

/// SGR: Italic on.
pub const ITALIC_START: &str = "\x1b[3m";

/// SGR: Italic off.
pub const ITALIC_END: &str = "\x1b[23m";

/// SGR: Underline on.
pub const UNDERLINE_START: &str = "\x1b[4m";

/// SGR: Underline off.
pub const UNDERLINE_END: &str = "\x1b[24m";

/// SGR: Strikethrough on.
pub const STRIKETHROUGH_START: &str = "\x1b[9m";

/// SGR: Strikethrough off.
pub const STRIKETHROUGH_END: &str = "\x1b[29m";

/// SGR: Inline code foreground (yellow).
pub const CODE_START: &str = "\x1b[33m";

/// SGR: Foreground color reset.
pub const FG_END: &str = "\x1b[39m";

/// SGR: Full attribute reset.
pub const RESET: &str = "\x1b[0m";

/// Line prefix for block quotes, a gray bar followed by a space.
pub const QUOTE_PREFIX: &str = "\x1b[90m│\x1b[39m ";
