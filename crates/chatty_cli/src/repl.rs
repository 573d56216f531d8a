//! The interactive read-eval-print loop.

use std::io::Write;

use chatty_client::Role;
use crossterm::style::Stylize as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};
use tracing::{debug, trace};

use crate::{
    command::{Command, HELP, MAX_COMMAND_LENGTH},
    error::Result,
    session::Session,
    store::SessionSummary,
};

/// Read prompts from `input` until it ends or the user leaves.
///
/// Failed requests are reported to `err` and the loop continues.
pub(crate) async fn run<R>(
    session: &mut Session,
    input: R,
    out: &mut dyn Write,
    err: &mut dyn Write,
    colors: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    writeln!(out, "Type a message, or /help for commands.")?;

    loop {
        if colors {
            write!(out, "{} ", ">".cyan().bold())?;
        } else {
            write!(out, "> ")?;
        }
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            debug!("End of input.");
            writeln!(out)?;
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Some(Command::Exit) => break,
            Some(Command::Reset) => {
                session.reset();
                writeln!(out, "Conversation cleared.")?;
            }
            Some(Command::Help) => writeln!(out, "{HELP}")?,
            Some(Command::History) => print_history(session, out)?,
            Some(Command::Markdown) => {
                let state = if session.toggle_markdown() {
                    "enabled"
                } else {
                    "disabled"
                };
                writeln!(out, "Markdown rendering {state}.")?;
            }
            Some(Command::List) => match session.sessions() {
                Ok(sessions) => print_sessions(&sessions, out)?,
                Err(error) => report(err, &error, colors)?,
            },
            Some(Command::Load(None)) => writeln!(err, "Usage: /load <session-id>")?,
            Some(Command::Load(Some(arg))) => {
                let Ok(id) = arg.parse::<i64>() else {
                    writeln!(err, "Invalid session id {arg:?}.")?;
                    continue;
                };

                match session.load(id) {
                    Ok(summary) => writeln!(
                        out,
                        "Loaded session #{}: {} ({} messages).",
                        summary.id,
                        title(&summary),
                        summary.message_count
                    )?,
                    Err(error) => report(err, &error, colors)?,
                }
            }
            Some(Command::TooLong) => {
                writeln!(err, "Command too long (max {MAX_COMMAND_LENGTH} characters).")?;
            }
            Some(Command::Unknown(name)) => {
                writeln!(err, "Unknown command: {name}. Use /help to see available commands.")?;
            }
            None => {
                trace!(bytes = line.len(), "Sending prompt.");
                if let Err(error) = session.send(line, out).await {
                    report(err, &error, colors)?;
                }
            }
        }
    }

    Ok(())
}

fn print_history(session: &Session, out: &mut dyn Write) -> Result<()> {
    if session.history().is_empty() {
        writeln!(out, "No messages yet.")?;
        return Ok(());
    }

    for message in session.history() {
        let role = match message.role {
            Role::System => "system",
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        writeln!(out, "{role}: {}", message.content)?;
    }

    Ok(())
}

fn print_sessions(sessions: &[SessionSummary], out: &mut dyn Write) -> Result<()> {
    if sessions.is_empty() {
        writeln!(out, "No saved sessions yet.")?;
        return Ok(());
    }

    for summary in sessions {
        writeln!(
            out,
            "#{} {} ({} messages, updated {})",
            summary.id,
            title(summary),
            summary.message_count,
            summary.updated_at
        )?;
    }

    Ok(())
}

fn title(summary: &SessionSummary) -> &str {
    if summary.name.trim().is_empty() {
        "Untitled session"
    } else {
        &summary.name
    }
}

/// Write an error to `err`.
pub(crate) fn report(
    err: &mut dyn Write,
    error: &dyn std::error::Error,
    colors: bool,
) -> Result<()> {
    if colors {
        writeln!(err, "{} {error}", "error:".red().bold())?;
    } else {
        writeln!(err, "error: {error}")?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "repl_tests.rs"]
mod tests;
