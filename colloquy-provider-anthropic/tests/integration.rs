//! Integration tests for the Anthropic client using wiremock.

use std::time::Duration;

use colloquy_provider_anthropic::Anthropic;
use colloquy_turn::{
    CompletionRequest, ContentBlock, Message, Provider, ProviderError, StopReason, ToolSchema,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn minimal_request() -> CompletionRequest {
    CompletionRequest {
        model: None,
        system: Some("You are helpful.".into()),
        messages: vec![Message::user("Hello")],
        tools: vec![],
        max_tokens: 1024,
        temperature: 1.0,
        stop_sequences: vec![],
    }
}

fn success_response_body() -> serde_json::Value {
    serde_json::json!({
        "id": "msg_01XFDUDYJgAACzvnptvVoYEL",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-20250514",
        "content": [{ "type": "text", "text": "Hello! How can I help you today?" }],
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {
            "input_tokens": 12,
            "output_tokens": 10
        }
    })
}

#[tokio::test]
async fn complete_sends_correct_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_response_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("test-api-key").base_url(mock_server.uri());

    let result = provider.complete(minimal_request()).await;
    assert!(result.is_ok(), "expected Ok, got: {:?}", result.err());

    let resp = result.unwrap();
    assert_eq!(resp.text(), "Hello! How can I help you today?");
    assert_eq!(resp.usage.input_tokens, 12);
    assert_eq!(resp.usage.output_tokens, 10);
    assert_eq!(resp.stop_reason, StopReason::EndTurn);
    assert!(resp.cost.is_some());
}

#[tokio::test]
async fn complete_sends_system_and_default_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-sonnet-4-20250514",
            "system": "You are helpful.",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_response_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("key").base_url(mock_server.uri());
    provider.complete(minimal_request()).await.unwrap();
}

#[tokio::test]
async fn empty_catalog_sends_no_tools_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_response_body()))
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("key").base_url(mock_server.uri());
    provider.complete(minimal_request()).await.unwrap();

    let received: Vec<Request> = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("tools").is_none());
}

#[tokio::test]
async fn complete_parses_tool_use_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({
            "tools": [{"name": "get_weather_forecast"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_2",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "Let me check."},
                {
                    "type": "tool_use",
                    "id": "toolu_01",
                    "name": "get_weather_forecast",
                    "input": {"city": "Oslo"}
                }
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 50, "output_tokens": 20}
        })))
        .mount(&mock_server)
        .await;

    let mut request = minimal_request();
    request.tools = vec![ToolSchema {
        name: "get_weather_forecast".into(),
        description: "Weather forecast for a city".into(),
        input_schema: serde_json::json!({"type": "object"}),
    }];

    let provider = Anthropic::new("key").base_url(mock_server.uri());
    let resp = provider.complete(request).await.unwrap();

    assert_eq!(resp.stop_reason, StopReason::ToolUse);
    let requests = resp.tool_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, "toolu_01");
    assert_eq!(requests[0].input["city"], "Oslo");
    assert!(matches!(&resp.content[0], ContentBlock::Text { text } if text == "Let me check."));
}

#[tokio::test]
async fn complete_returns_authentication_error_on_401() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("bad").base_url(mock_server.uri());
    let err = provider.complete(minimal_request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Authentication(_)), "got {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn complete_returns_rate_limit_error_on_429() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "20")
                .set_body_json(serde_json::json!({
                    "type": "error",
                    "error": {"type": "rate_limit_error", "message": "slow down"}
                })),
        )
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("key").base_url(mock_server.uri());
    let err = provider.complete(minimal_request()).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(20)));
}

#[tokio::test]
async fn complete_returns_connection_error_on_overload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("key").base_url(mock_server.uri());
    let err = provider.complete(minimal_request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Connection(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_body_is_protocol_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("key").base_url(mock_server.uri());
    let err = provider.complete(minimal_request()).await.unwrap_err();

    assert!(matches!(err, ProviderError::Protocol(_)), "got {err:?}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn slow_server_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_response_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let provider = Anthropic::new("key")
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(100));
    let err = provider.complete(minimal_request()).await.unwrap_err();

    assert!(
        matches!(err, ProviderError::Timeout(d) if d == Duration::from_millis(100)),
        "got {err:?}"
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_server_is_connection_error() {
    let provider = Anthropic::new("key").base_url("http://127.0.0.1:9");
    let err = provider.complete(minimal_request()).await.unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");
}
