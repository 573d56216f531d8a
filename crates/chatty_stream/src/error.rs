use std::io;

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// A fatal failure while decoding the event framing of a response body.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("event line exceeds maximum length of {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("event line is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("stream read error: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced while running a response through the filter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("sink error: {0}")]
    Sink(#[source] io::Error),
}

#[cfg(test)]
impl PartialEq for DecodeError {
    fn eq(&self, other: &Self) -> bool {
        if std::mem::discriminant(self) != std::mem::discriminant(other) {
            return false;
        }

        // Good enough for testing purposes
        format!("{self:?}") == format!("{other:?}")
    }
}
