use std::io;

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// CLI Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(#[from] chatty_client::Error),

    #[error("Stream error: {0}")]
    Stream(#[from] chatty_stream::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("persistence is disabled")]
    PersistenceDisabled,

    #[error("session #{0} not found")]
    SessionNotFound(i64),

    #[error("unknown message role {0:?} in saved session")]
    InvalidRole(String),

    #[error("prompt too long (max {max} characters)")]
    PromptTooLong { max: usize },
}
