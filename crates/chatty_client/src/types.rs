use serde::{Deserialize, Serialize};

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
}

/// The JSON body sent to the completions endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct RequestBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,

    /// Omitted for `o3` models, which reject it.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

impl<'a> RequestBody<'a> {
    pub(crate) fn new(request: &'a ChatRequest, stream: bool) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            stream,
            temperature: (!request.model.starts_with("o3")).then_some(request.temperature),
        }
    }
}

/// A non-streaming chat completion response.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// The error body of a failed request.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Object {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Extract the error message from an API error body, if it has one.
///
/// Providers disagree on the shape: some send `{"error": "…"}`, others
/// `{"error": {"message": "…"}}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let message = match serde_json::from_str::<ErrorResponse>(body).ok()?.error {
        ErrorDetail::Message(message) => Some(message),
        ErrorDetail::Object { message } => message,
    };

    message.filter(|message| !message.is_empty())
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
