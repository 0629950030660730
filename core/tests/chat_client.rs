//! HTTP-level tests for the chat client against a mock server.

use confab_core::{ChatClient, ChatConfig, ConfabError, RetryPolicy};
use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn test_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

fn client_for(server: &mockito::Server, bot_id: &str) -> ChatClient {
    let config = ChatConfig::new(format!("{}/v3/chat", server.url()), "tkn", bot_id)
        .with_timeout(Duration::from_secs(5));
    ChatClient::new(config, test_policy()).unwrap()
}

#[tokio::test]
async fn empty_parameters_fail_before_any_network_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/chat")
        .expect(0)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let err = client.send_message("", "hello").await.unwrap_err();
    assert!(matches!(err, ConfabError::Parameter("user_id")));

    let err = client.send_message("u1", "").await.unwrap_err();
    assert!(matches!(err, ConfabError::Parameter("content")));

    let unconfigured = client_for(&server, "");
    let err = unconfigured.send_message("u1", "hello").await.unwrap_err();
    assert!(matches!(err, ConfabError::Parameter("bot_id")));

    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_maps_to_token_invalid_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/chat")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let err = client.send_message("u1", "hello").await.unwrap_err();
    assert!(matches!(err, ConfabError::TokenInvalid));
    mock.assert_async().await;
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited_without_retry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/chat")
        .with_status(429)
        .expect(1)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let err = client.send_message("u1", "hello").await.unwrap_err();
    assert!(matches!(err, ConfabError::RateLimited));
    mock.assert_async().await;
}

#[tokio::test]
async fn other_failure_status_carries_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/chat")
        .with_status(503)
        .with_body("upstream capacity exceeded")
        .expect(1)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let err = client.send_message("u1", "hello").await.unwrap_err();
    match err {
        ConfabError::Api { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("upstream capacity exceeded"));
        }
        other => panic!("expected api error, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn successful_call_sends_expected_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/chat")
        .match_header("authorization", "Bearer tkn")
        .match_body(Matcher::PartialJson(json!({
            "bot_id": "bot1",
            "user_id": "u1",
            "stream": false,
            "auto_save_history": true,
            "additional_messages": [{"role": "user", "content": "hello", "content_type": "text"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": 0, "msg": "ok", "data": {"id": "chat-1"}}"#)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let response = client.send_message("u1", "hello").await.unwrap();
    assert_eq!(response.code, 0);
    assert_eq!(response.msg, "ok");
    assert_eq!(response.data["id"], "chat-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn streaming_call_decodes_events_until_sentinel() {
    let body = concat!(
        "event: conversation.message.delta\n",
        "data: {\"content\":\"hel\"}\n",
        "\n",
        "data: {\"content\":\"lo\"}\n",
        "event: conversation.chat.completed\n",
        "data: {\"status\":\"completed\"}\n",
        "data: [DONE]\n",
        "data: never-delivered\n",
    );
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v3/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let stream = client.send_message_stream("u1", "hello").await.unwrap();
    let events: Vec<_> = stream
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0].event.as_deref(),
        Some("conversation.message.delta")
    );
    assert_eq!(events[0].data, r#"{"content":"hel"}"#);
    assert_eq!(
        events[1].event.as_deref(),
        Some("conversation.message.delta")
    );
    assert_eq!(
        events[2].event.as_deref(),
        Some("conversation.chat.completed")
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn streaming_failure_status_is_mapped_before_decoding() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v3/chat")
        .with_status(401)
        .create_async()
        .await;
    let client = client_for(&server, "bot1");

    let err = client
        .send_message_stream("u1", "hello")
        .await
        .err()
        .expect("expected error");
    assert!(matches!(err, ConfabError::TokenInvalid));
}

#[tokio::test]
async fn unreachable_endpoint_surfaces_transport_failure() {
    let config = ChatConfig::new("http://127.0.0.1:9/v3/chat", "tkn", "bot1")
        .with_timeout(Duration::from_secs(1));
    let client = ChatClient::new(config, RetryPolicy::new(2, Duration::from_millis(1))).unwrap();

    let err = client.send_message("u1", "hello").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, ConfabError::Transport(_)));
}
