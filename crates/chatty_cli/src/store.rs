//! Saved conversations, kept in a SQLite database.

use std::{fs, path::Path};

use chatty_client::{Message, Role};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Longest session title, in characters, taken from the first prompt.
const MAX_TITLE_LENGTH: usize = 80;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
    );

    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
        FOREIGN KEY(session_id) REFERENCES sessions(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id);
";

/// A saved conversation, without its messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionSummary {
    pub id: i64,
    pub name: String,
    pub updated_at: String,
    pub message_count: i64,
}

/// A saved conversation with its messages, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SavedSession {
    pub summary: SessionSummary,
    pub messages: Vec<Message>,
}

pub(crate) struct Store {
    conn: Connection,
}

impl Store {
    /// Open the database at `path`, creating it and its directory if needed.
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        trace!(db = %path.display(), "Opening session store.");
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create a session titled after the first line of `prompt`.
    pub(crate) fn create_session(&self, prompt: &str) -> Result<i64> {
        let name: String = prompt
            .trim()
            .lines()
            .next()
            .unwrap_or_default()
            .chars()
            .take(MAX_TITLE_LENGTH)
            .collect();

        self.conn
            .execute("INSERT INTO sessions (name) VALUES (?1)", params![name])?;

        let id = self.conn.last_insert_rowid();
        debug!(id, %name, "Created session.");

        Ok(id)
    }

    /// Append `messages` to a session, all or nothing.
    pub(crate) fn append(&self, session_id: i64, messages: &[Message]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO messages (session_id, role, content) VALUES (?1, ?2, ?3)",
            )?;

            for message in messages {
                stmt.execute(params![session_id, role_name(message.role), message.content])?;
            }
        }

        tx.execute(
            "UPDATE sessions SET updated_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE id = ?1",
            params![session_id],
        )?;
        tx.commit()?;

        trace!(session_id, messages = messages.len(), "Saved messages.");
        Ok(())
    }

    /// All saved sessions, most recently active first.
    pub(crate) fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, s.updated_at, COUNT(m.id)
             FROM sessions s
             LEFT JOIN messages m ON m.session_id = s.id
             GROUP BY s.id
             ORDER BY s.updated_at DESC, s.id DESC",
        )?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    updated_at: row.get(2)?,
                    message_count: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Load a session and its messages.
    pub(crate) fn load(&self, id: i64) -> Result<SavedSession> {
        let summary = self
            .conn
            .query_row(
                "SELECT s.id, s.name, s.updated_at,
                        (SELECT COUNT(*) FROM messages m WHERE m.session_id = s.id)
                 FROM sessions s WHERE s.id = ?1",
                params![id],
                |row| {
                    Ok(SessionSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        updated_at: row.get(2)?,
                        message_count: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or(Error::SessionNotFound(id))?;

        let mut stmt = self.conn.prepare(
            "SELECT role, content FROM messages WHERE session_id = ?1 ORDER BY id",
        )?;

        let messages = stmt
            .query_map(params![id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .map(|row| -> Result<Message> {
                let (role, content) = row?;
                let role = parse_role(&role).ok_or(Error::InvalidRole(role))?;
                Ok(Message { role, content })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(id, messages = messages.len(), "Loaded session.");
        Ok(SavedSession { summary, messages })
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn parse_role(role: &str) -> Option<Role> {
    match role {
        "system" => Some(Role::System),
        "user" => Some(Role::User),
        "assistant" => Some(Role::Assistant),
        _ => None,
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
