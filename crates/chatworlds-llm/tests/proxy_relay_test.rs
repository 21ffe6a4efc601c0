use chatworlds_llm::{ChatMessage, ModelRelay, ProxyRelay, RelayError};
use mockito::Matcher;
use serde_json::json;

fn history() -> Vec<ChatMessage> {
    vec![ChatMessage::user("What is Rust?")]
}

#[tokio::test]
async fn test_proxy_sends_bearer_token_and_model() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/relay/chat")
        .match_header("authorization", "Bearer session-token")
        .match_body(Matcher::Json(json!({
            "messages": [{"role": "user", "content": "What is Rust?"}],
            "model": "anthropic/claude-3-sonnet"
        })))
        .with_status(200)
        .with_body(json!({"content": "A systems language.", "model": "anthropic/claude-3-sonnet"}).to_string())
        .create_async()
        .await;

    let relay = ProxyRelay::new(format!("{}/relay/chat", server.url()), "session-token").unwrap();
    let completion = relay
        .complete("user-1", history(), "anthropic/claude-3-sonnet")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(completion.content, "A systems language.");
}

#[tokio::test]
async fn test_proxy_maps_missing_credential() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/relay/chat")
        .with_status(400)
        .with_body(
            json!({
                "error": "OpenRouter API key not found. Please add it in Settings.",
                "code": "missing_credential"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let relay = ProxyRelay::new(format!("{}/relay/chat", server.url()), "session-token").unwrap();
    let err = relay
        .complete("user-1", history(), "openai/gpt-4-turbo")
        .await
        .unwrap_err();

    assert_eq!(err, RelayError::MissingCredential);
}

#[tokio::test]
async fn test_proxy_restores_upstream_status_and_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/relay/chat")
        .with_status(429)
        .with_body(json!({"error": "Rate limit exceeded (429)"}).to_string())
        .create_async()
        .await;

    let relay = ProxyRelay::new(format!("{}/relay/chat", server.url()), "session-token").unwrap();
    let err = relay
        .complete("user-1", history(), "openai/gpt-4-turbo")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RelayError::Upstream {
            status: 429,
            message: "Rate limit exceeded".to_string(),
        }
    );
}

#[tokio::test]
async fn test_proxy_rejects_success_without_content() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/relay/chat")
        .with_status(200)
        .with_body(json!({"model": "openai/gpt-4-turbo"}).to_string())
        .create_async()
        .await;

    let relay = ProxyRelay::new(format!("{}/relay/chat", server.url()), "session-token").unwrap();
    let err = relay
        .complete("user-1", history(), "openai/gpt-4-turbo")
        .await
        .unwrap_err();

    assert_eq!(err, RelayError::InvalidUpstreamResponse);
}
