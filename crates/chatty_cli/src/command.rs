//! Slash commands of the interactive session.

/// Longest accepted command line, in characters.
pub(crate) const MAX_COMMAND_LENGTH: usize = 1000;

/// Listed by `/help`.
pub(crate) const HELP: &str = "\
Commands:
  /help              Show this help
  /history           Show the conversation so far
  /markdown          Toggle the markdown re-render of replies
  /list, /sessions   Show saved conversations
  /load <id>         Continue a saved conversation
  /reset, /clear     Forget the conversation
  /exit, /quit       Leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Exit,
    Reset,
    Help,
    History,
    Markdown,
    List,

    /// `/load`, with its argument if one was given.
    Load(Option<String>),

    /// A command line longer than [`MAX_COMMAND_LENGTH`].
    TooLong,

    /// Any other `/…` input, by name.
    Unknown(String),
}

impl Command {
    /// Parse a line of input, or `None` if it is a prompt.
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let line = input.trim().strip_prefix('/')?;
        if line.chars().count() >= MAX_COMMAND_LENGTH {
            return Some(Self::TooLong);
        }

        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();

        let command = match name {
            "exit" | "quit" => Self::Exit,
            "reset" | "clear" => Self::Reset,
            "help" => Self::Help,
            "history" => Self::History,
            "markdown" => Self::Markdown,
            "list" | "sessions" => Self::List,
            "load" => Self::Load(words.next().map(str::to_owned)),
            _ => Self::Unknown(format!("/{name}")),
        };

        Some(command)
    }
}
