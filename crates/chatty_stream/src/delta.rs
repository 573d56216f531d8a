//! Extraction of content increments from event payloads.

use serde::Deserialize;
use tracing::{debug, warn};

/// A possibly-empty content increment extracted from one event.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delta {
    pub content: String,
}

impl Delta {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[must_use]
    pub fn into_content(self) -> String {
        self.content
    }
}

/// One chunk of a streaming chat completion.
#[derive(Debug, Default, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: ChoiceDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChoiceDelta {
    #[serde(default)]
    content: Option<String>,
}

/// An error envelope some providers send in the middle of a stream.
#[derive(Debug, Deserialize)]
struct ErrorChunk {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Message(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Extract the content increment of the first choice in `payload`.
///
/// This never fails: a payload that is not valid JSON, has no choices, or has
/// no content results in an empty [`Delta`]. Upstream providers are known to
/// send the occasional malformed chunk, which must not abort the stream.
#[must_use]
pub fn extract(payload: &str) -> Delta {
    let chunk = match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => chunk,
        Err(error) => {
            debug!(%error, payload, "Skipping malformed event payload.");
            return Delta::default();
        }
    };

    if chunk.choices.is_empty() {
        log_error_envelope(payload);
    }

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .map(Delta::content)
        .unwrap_or_default()
}

fn log_error_envelope(payload: &str) {
    let Ok(ErrorChunk { error }) = serde_json::from_str::<ErrorChunk>(payload) else {
        return;
    };

    let message = match error {
        ErrorBody::Message(message) | ErrorBody::Object { message: Some(message) } => message,
        ErrorBody::Object { message: None } => "unknown error".to_owned(),
    };

    warn!(error = %message, "Provider reported an error in the event stream.");
}

#[cfg(test)]
#[path = "delta_tests.rs"]
mod tests;
