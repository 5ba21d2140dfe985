use futures::StreamExt;
use pretty_assertions::assert_eq;
use scholarag_helper::agent::ResponseGenerator;
use scholarag_helper::conversation::Conversation;
use scholarag_helper::error::GenerationError;
use scholarag_helper::knowledge::demo::DEMO_MARKER;
use scholarag_helper::llm::chat::{ new_client, ChatClient };
use scholarag_helper::llm::{ LlmConfig, LlmType };
use scholarag_helper::models::chat::{ ChatMessage, ChatRequest };
use serde_json::{ json, Value };
use std::sync::Arc;
use wiremock::matchers::{ header, method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

fn client(server: &MockServer, api_key: Option<&str>) -> Arc<dyn ChatClient> {
    new_client(
        &(LlmConfig {
            llm_type: LlmType::Anthropic,
            api_key: api_key.map(str::to_string),
            base_url: Some(server.uri()),
            ..Default::default()
        })
    ).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest {
        system: "You are a helpful assistant.".to_string(),
        max_tokens: 2048,
        messages: vec![ChatMessage::user("What is the 7-stage workflow?")],
    }
}

fn sse(events: &[Value]) -> String {
    events
        .iter()
        .map(|e| format!("event: {}\ndata: {}\n\n", e["type"].as_str().unwrap(), e))
        .collect()
}

#[tokio::test]
async fn complete_sends_messages_api_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(
                json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "content": [{"type": "text", "text": "Seven stages."}],
                "stop_reason": "end_turn"
            })
            )
        )
        .expect(1)
        .mount(&server).await;

    let reply = client(&server, Some("test-key")).complete(&request()).await.unwrap();
    assert_eq!(reply, "Seven stages.");

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(
        body,
        json!({
            "model": "claude-sonnet-4-5-20250929",
            "max_tokens": 2048,
            "system": "You are a helpful assistant.",
            "messages": [{"role": "user", "content": "What is the 7-stage workflow?"}]
        })
    );
}

#[tokio::test]
async fn missing_api_key_fails_without_calling_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let client = client(&server, None);
    assert!(matches!(client.complete(&request()).await, Err(GenerationError::Configuration(_))));
    assert!(matches!(client.complete_stream(&request()).await, Err(GenerationError::Configuration(_))));
}

#[tokio::test]
async fn error_status_carries_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(
                json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })
            )
        )
        .mount(&server).await;

    match client(&server, Some("bad")).complete(&request()).await {
        Err(GenerationError::Status { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "invalid x-api-key");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn reply_without_text_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .mount(&server).await;

    let result = client(&server, Some("k")).complete(&request()).await;
    assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));
}

#[tokio::test]
async fn stream_yields_text_deltas_in_order() {
    let server = MockServer::start().await;
    let body = sse(
        &[
            json!({"type": "message_start", "message": {"id": "msg_1", "content": []}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "ping"}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Stage "}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "one, "}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "stage two."}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}}),
            json!({"type": "message_stop"}),
        ]
    );
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/event-stream").set_body_string(body))
        .mount(&server).await;

    let stream = client(&server, Some("k")).complete_stream(&request()).await.unwrap();
    let fragments: Vec<String> = stream.map(|f| f.unwrap()).collect().await;
    assert_eq!(fragments, vec!["Stage ", "one, ", "stage two."]);

    let received = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["stream"], json!(true));
}

#[tokio::test]
async fn stream_error_event_arrives_after_partial_output() {
    let server = MockServer::start().await;
    let body = sse(
        &[
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Partial"}}),
            json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
        ]
    );
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/event-stream").set_body_string(body))
        .mount(&server).await;

    let items: Vec<_> = client(&server, Some("k")).complete_stream(&request()).await.unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "Partial");
    assert!(matches!(items[1], Err(GenerationError::Status { .. })));
}

#[tokio::test]
async fn stream_rejected_upfront_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server).await;

    let result = client(&server, Some("k")).complete_stream(&request()).await;
    assert!(matches!(result, Err(GenerationError::Status { status: 529, .. })));
}

async fn mount_stream(server: &MockServer, events: &[Value]) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/event-stream").set_body_string(sse(events))
        )
        .mount(server).await;
}

#[tokio::test]
async fn stream_closed_before_message_stop_is_malformed() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        &[
            json!({"type": "message_start", "message": {"id": "msg_1", "content": []}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Cut"}}),
        ]
    ).await;

    let items: Vec<_> = client(&server, Some("k")).complete_stream(&request()).await.unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), "Cut");
    assert!(matches!(items[1], Err(GenerationError::MalformedResponse(_))));
}

#[tokio::test]
async fn stream_without_text_is_malformed() {
    let server = MockServer::start().await;
    mount_stream(
        &server,
        &[
            json!({"type": "message_start", "message": {"id": "msg_1", "content": []}}),
            json!({"type": "message_stop"}),
        ]
    ).await;

    let items: Vec<_> = client(&server, Some("k")).complete_stream(&request()).await.unwrap().collect().await;
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(GenerationError::MalformedResponse(_))));
}

#[tokio::test]
async fn empty_stream_falls_back_in_conversation() {
    let server = MockServer::start().await;
    mount_stream(&server, &[json!({"type": "message_start", "message": {"id": "msg_1", "content": []}})]).await;

    let generator = ResponseGenerator::new(client(&server, Some("k")), "persona");
    let mut chunks = 0;
    let result = generator.respond_streaming(&[ChatMessage::user("hi")], |_| chunks += 1, true).await;
    assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));
    assert_eq!(chunks, 0);

    let mut chat = Conversation::new();
    let reply = chat.send_streaming(&generator, "hi", |_| {}).await.unwrap();
    assert!(reply.fallback);
    assert!(reply.message.content.starts_with(DEMO_MARKER));
}
