//! HTTP transport for OpenAI-compatible chat completion APIs.

mod client;
mod error;
pub mod retry;
pub mod types;

pub use client::{Client, ResponseBody};
pub use error::Error;
pub use retry::RetryConfig;
pub use types::{ChatRequest, Message, Role};
