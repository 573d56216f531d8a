use std::{collections::HashMap, io, pin::Pin, time::Duration};

use futures::TryStreamExt as _;
use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tracing::{debug, error, trace, warn};

use crate::{
    error::{Error, Result},
    retry::RetryConfig,
    types::{ChatRequest, CompletionResponse, RequestBody, error_message},
};

/// Total time allowed for a non-streaming request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Total time allowed for a streaming request, including the body.
const STREAMING_TIMEOUT: Duration = Duration::from_secs(120);

const USER_AGENT_VALUE: &str = concat!("chatty/", env!("CARGO_PKG_VERSION"));

/// The raw body of a streaming response.
pub type ResponseBody = Pin<Box<dyn AsyncRead + Send>>;

/// A client for OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
    retry: RetryConfig,
}

impl Client {
    /// Create a new client.
    ///
    /// Both values are trimmed. The key must be non-empty and the URL must
    /// use the `http` or `https` scheme.
    pub fn new(api_key: impl AsRef<str>, base_url: impl AsRef<str>) -> Result<Self> {
        let api_key = api_key.as_ref().trim();
        if api_key.is_empty() {
            return Err(Error::Config("API key cannot be empty".to_owned()));
        }

        let base_url = base_url.as_ref().trim();
        if base_url.is_empty() {
            return Err(Error::Config("base URL cannot be empty".to_owned()));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base URL must start with http:// or https://, got: {base_url}"
            )));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            api_key: api_key.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            http_client,
            retry: RetryConfig::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request a complete reply in a single response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let response = self.send(request, false).await?;
        let completion: CompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or(Error::EmptyResponse)
    }

    /// Request a streamed reply.
    ///
    /// Returns the raw server-sent event body, to be decoded by the caller.
    /// Retries only cover the request itself, never a body that has started
    /// to arrive.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ResponseBody> {
        let response = self.send(request, true).await?;
        let bytes = response.bytes_stream().map_err(io::Error::other);

        Ok(Box::pin(StreamReader::new(bytes)))
    }

    /// Build HTTP headers required for making API calls.
    fn build_headers(&self, stream: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        headers.insert(
            AUTHORIZATION,
            format!("Bearer {}", self.api_key)
                .parse()
                .map_err(|e| Error::Config(format!("Invalid API key header format: {e}")))?,
        );

        if stream {
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        }

        Ok(headers)
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let mut attempt = 0;

        loop {
            match self.send_once(request, stream).await {
                Ok(response) => return Ok(response),
                Err(error) if error.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);

                    warn!(
                        %error,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis(),
                        "Request failed. Retrying."
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn send_once(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let headers = self.build_headers(stream)?;
        let body = RequestBody::new(request, stream);
        let timeout = if stream {
            STREAMING_TIMEOUT
        } else {
            DEFAULT_TIMEOUT
        };

        let redacted_headers = headers
            .iter()
            .map(|(k, v)| {
                if *k == AUTHORIZATION {
                    return (k.to_owned(), "[REDACTED]".to_owned());
                }

                (k.to_owned(), v.to_str().unwrap_or_default().to_owned())
            })
            .collect::<HashMap<_, _>>();

        trace!(%url, headers = ?redacted_headers, stream, "Triggering request.");
        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .map(|v| v.to_str().unwrap_or_default()),
            "Received response."
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body, "Unexpected response.");

        Err(Error::Api {
            code: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| fallback_message(status)),
        })
    }
}

fn fallback_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_owned()
}
