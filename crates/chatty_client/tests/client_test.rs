use chatty_client::{ChatRequest, Client, Error, Message, RetryConfig};
use chatty_stream::{Event, ResponseFilter};
use httpmock::{Method::POST, MockServer};
use pretty_assertions::assert_eq;
use test_log::test;

fn request(model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_owned(),
        messages: vec![
            Message::user("be brief"),
            Message::assistant("ok"),
            Message::user("hello"),
        ],
        temperature: 0.7,
    }
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        base_backoff_ms: 1,
        max_backoff_secs: 1,
    }
}

#[test]
fn test_new_validates_inputs() {
    assert!(matches!(
        Client::new("  ", "https://api.example.com"),
        Err(Error::Config(_))
    ));
    assert!(matches!(Client::new("key", ""), Err(Error::Config(_))));
    assert!(matches!(
        Client::new("key", "ftp://api.example.com"),
        Err(Error::Config(_))
    ));

    let client = Client::new(" key ", "https://api.example.com/v1/").unwrap();
    assert_eq!(client.base_url(), "https://api.example.com/v1");
}

#[test(tokio::test)]
async fn test_chat_returns_first_choice() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer secret")
                .header("content-type", "application/json")
                .json_body_includes(r#"{"model":"gpt-4o","stream":false,"temperature":0.7}"#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#);
        })
        .await;

    let client = Client::new("secret", server.base_url()).unwrap();
    let reply = client.chat(&request("gpt-4o")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "hi there");
}

#[test(tokio::test)]
async fn test_chat_without_choices_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body(r#"{"choices":[]}"#);
        })
        .await;

    let client = Client::new("secret", server.base_url()).unwrap();
    let error = client.chat(&request("gpt-4o")).await.unwrap_err();

    assert!(matches!(error, Error::EmptyResponse), "{error:?}");
}

#[test(tokio::test)]
async fn test_malformed_completion_is_a_request_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body("{not json");
        })
        .await;

    let client = Client::new("secret", server.base_url())
        .unwrap()
        .with_retry(fast_retry(3));
    let error = client.chat(&request("gpt-4o")).await.unwrap_err();

    mock.assert_hits_async(1).await;
    assert!(
        matches!(&error, Error::Request(inner) if inner.is_decode()),
        "{error:?}"
    );
    assert!(!error.is_transient());
}

#[test(tokio::test)]
async fn test_api_error_message_is_extracted() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401)
                .body(r#"{"error":{"message":"invalid api key","type":"auth"}}"#);
        })
        .await;

    let client = Client::new("secret", server.base_url())
        .unwrap()
        .with_retry(fast_retry(3));
    let error = client.chat(&request("gpt-4o")).await.unwrap_err();

    // Client errors are never retried.
    mock.assert_hits_async(1).await;
    match error {
        Error::Api { code, message } => {
            assert_eq!(code, 401);
            assert_eq!(message, "invalid api key");
        }
        error => panic!("unexpected error: {error:?}"),
    }
}

#[test(tokio::test)]
async fn test_api_error_without_body_uses_status_reason() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(404).body("not json");
        })
        .await;

    let client = Client::new("secret", server.base_url()).unwrap();
    let error = client.chat(&request("gpt-4o")).await.unwrap_err();

    assert!(
        matches!(&error, Error::Api { code: 404, message } if message == "Not Found"),
        "{error:?}"
    );
}

#[test(tokio::test)]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503).body(r#"{"error":"overloaded"}"#);
        })
        .await;

    let client = Client::new("secret", server.base_url())
        .unwrap()
        .with_retry(fast_retry(2));
    let error = client.chat(&request("gpt-4o")).await.unwrap_err();

    mock.assert_hits_async(3).await;
    assert!(
        matches!(&error, Error::Api { code: 503, message } if message == "overloaded"),
        "{error:?}"
    );
}

#[test(tokio::test)]
async fn test_o3_models_omit_temperature() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .body_excludes("temperature");
            then.status(200)
                .body(r#"{"choices":[{"message":{"content":"ok"}}]}"#);
        })
        .await;

    let client = Client::new("secret", server.base_url()).unwrap();
    let reply = client.chat(&request("o3-mini")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "ok");
}

#[test(tokio::test)]
async fn test_chat_stream_feeds_the_response_filter() {
    let body = [
        r#"data: {"choices":[{"delta":{"content":"<thi"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"nk>plan</think>"}}]}"#,
        ": keep-alive",
        r#"data: {"choices":[{"delta":{"content":"Answer"}}]}"#,
        "data: [DONE]",
        "",
    ]
    .join("\n");

    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("accept", "text/event-stream")
                .json_body_includes(r#"{"stream":true}"#);
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(body);
        })
        .await;

    let client = Client::new("secret", server.base_url()).unwrap();
    let reader = client.chat_stream(&request("gpt-4o")).await.unwrap();

    let mut events: Vec<Event> = vec![];
    let transcript = ResponseFilter::default()
        .run(reader, &mut events)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(transcript.full_text, "<think>plan</think>Answer");
    assert_eq!(transcript.post_reasoning_text, "Answer");
    assert_eq!(transcript.render_source(), "Answer");

    let visible: String = events
        .iter()
        .filter_map(|event| match event {
            Event::Visible(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(visible, "Answer");
}
