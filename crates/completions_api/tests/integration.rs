mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use chat_transport::cancel_signal;
use completions_api::{
    ChatCompletionRequest, CompletionsApiError, CompletionsClient, CompletionsConfig,
    StructuredCallError,
};
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use support::{
    delta_frame, json_response, sse_response, ResponseChunk, ScriptedResponse, ScriptedServer,
};
use tokio::time::{sleep, timeout, Duration};

fn client_for(server: &ScriptedServer) -> CompletionsClient {
    let config = CompletionsConfig::new(&server.base_url, "test-model").with_api_key("sk-local");
    CompletionsClient::new(config).expect("client")
}

#[tokio::test]
async fn stream_chat_yields_deltas_until_done() {
    let hi = delta_frame("Hi");
    let there = delta_frame(" there");
    let after = delta_frame("never");
    let server = ScriptedServer::new(vec![sse_response(&[&hi, &there, "[DONE]", &after])]).await;
    let client = client_for(&server);

    let request = ChatCompletionRequest::for_turn("test-model", "sys", &[], "hello");
    let deltas: Vec<String> = client
        .stream_chat(request, cancel_signal())
        .map(|delta| delta.expect("stream should succeed"))
        .collect()
        .await;

    assert_eq!(deltas, vec!["Hi".to_string(), " there".to_string()]);

    let captured = server.captured();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].head.starts_with("POST /v1/chat/completions"));
    assert_eq!(
        captured[0].header("authorization").as_deref(),
        Some("Bearer sk-local")
    );
    let body = captured[0].json();
    assert_eq!(body["stream"], true);
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "hello");

    server.shutdown();
}

#[tokio::test]
async fn malformed_events_are_skipped_without_ending_the_stream() {
    let ok = delta_frame("ok");
    let server =
        ScriptedServer::new(vec![sse_response(&["{broken-json", &ok, "[DONE]"])]).await;
    let client = client_for(&server);

    let request = ChatCompletionRequest::for_turn("test-model", "sys", &[], "hello");
    let deltas: Vec<_> = client.stream_chat(request, cancel_signal()).collect().await;

    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0].as_deref().expect("delta"), "ok");

    server.shutdown();
}

#[tokio::test]
async fn unauthorized_status_is_classified_before_streaming() {
    let server = ScriptedServer::new(vec![json_response(
        401,
        r#"{"error":{"message":"bad key"}}"#,
    )])
    .await;
    let client = client_for(&server);

    let request = ChatCompletionRequest::for_turn("test-model", "sys", &[], "hello");
    let items: Vec<_> = client.stream_chat(request, cancel_signal()).collect().await;

    assert_eq!(items.len(), 1);
    assert!(matches!(
        &items[0],
        Err(CompletionsApiError::AuthenticationFailed { body }) if body.contains("bad key")
    ));

    server.shutdown();
}

#[tokio::test]
async fn not_found_and_other_statuses_carry_body() {
    let server = ScriptedServer::new(vec![
        json_response(404, "no such route"),
        json_response(503, "overloaded"),
    ])
    .await;
    let client = client_for(&server);
    let cancel = cancel_signal();

    let first = client
        .complete(ChatCompletionRequest::for_turn("m", "s", &[], "u"), &cancel)
        .await;
    assert!(matches!(
        first,
        Err(CompletionsApiError::EndpointNotFound { body }) if body == "no such route"
    ));

    let second = client
        .complete(ChatCompletionRequest::for_turn("m", "s", &[], "u"), &cancel)
        .await;
    match second {
        Err(CompletionsApiError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    server.shutdown();
}

#[tokio::test]
async fn cancellation_mid_stream_stops_reading() {
    let first = format!("data: {}\n\n", delta_frame("first"));
    let second = format!("data: {}\n\n", delta_frame("second"));
    let server = ScriptedServer::new(vec![ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            ResponseChunk {
                delay_ms: 0,
                bytes: first.into_bytes(),
            },
            ResponseChunk {
                delay_ms: 2_000,
                bytes: second.into_bytes(),
            },
        ],
    }])
    .await;
    let client = client_for(&server);
    let cancel = cancel_signal();

    let request = ChatCompletionRequest::for_turn("test-model", "sys", &[], "hello");
    let stream = client.stream_chat(request, Arc::clone(&cancel));
    futures_util::pin_mut!(stream);

    let first = stream.next().await.expect("first item").expect("first delta");
    assert_eq!(first, "first");

    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        flag.store(true, Ordering::Release);
    });

    let next = timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("cancellation should not wait for the delayed chunk");
    assert!(matches!(next, Some(Err(CompletionsApiError::Cancelled))));
    assert!(stream.next().await.is_none());

    server.shutdown();
}

#[tokio::test]
async fn cancelled_before_request_never_reaches_server() {
    let server = ScriptedServer::new(vec![sse_response(&["[DONE]"])]).await;
    let client = client_for(&server);
    let cancel = cancel_signal();
    cancel.store(true, Ordering::Release);

    let request = ChatCompletionRequest::for_turn("test-model", "sys", &[], "hello");
    let items: Vec<_> = client.stream_chat(request, cancel).collect().await;

    assert!(matches!(items.as_slice(), [Err(CompletionsApiError::Cancelled)]));
    assert_eq!(server.request_count(), 0);

    server.shutdown();
}

#[derive(Debug, Deserialize, PartialEq)]
struct Improved {
    improved_prompt: String,
}

#[tokio::test]
async fn complete_structured_extracts_fenced_json() {
    let content = "Here it is:\n```json\n{\"improved_prompt\": \"Write a sonnet.\"}\n```";
    let body = serde_json::json!({"choices": [{"message": {"content": content}}]}).to_string();
    let server = ScriptedServer::new(vec![json_response(200, &body)]).await;
    let client = client_for(&server);

    let improved: Improved = client
        .complete_structured(
            ChatCompletionRequest::for_turn("m", "s", &[], "improve"),
            &cancel_signal(),
        )
        .await
        .expect("structured reply");

    assert_eq!(
        improved,
        Improved {
            improved_prompt: "Write a sonnet.".to_string()
        }
    );
    assert!(server.captured()[0].json().get("stream").is_none());

    server.shutdown();
}

#[tokio::test]
async fn complete_structured_separates_payload_errors_from_reachability() {
    let body = serde_json::json!({"choices": [{"message": {"content": "no json, sorry"}}]})
        .to_string();
    let server = ScriptedServer::new(vec![
        json_response(200, &body),
        json_response(500, "boom"),
    ])
    .await;
    let client = client_for(&server);
    let cancel = cancel_signal();

    let invalid = client
        .complete_structured::<Improved>(ChatCompletionRequest::for_turn("m", "s", &[], "x"), &cancel)
        .await
        .expect_err("payload should be rejected");
    assert!(matches!(invalid, StructuredCallError::InvalidPayload(_)));

    let unreachable = client
        .complete_structured::<Improved>(ChatCompletionRequest::for_turn("m", "s", &[], "x"), &cancel)
        .await
        .expect_err("status should be rejected");
    assert!(matches!(unreachable, StructuredCallError::Unreachable(_)));

    server.shutdown();
}
