use chat_transport::ChatMessage;
use completions_api::{
    normalize_completions_url, ChatCompletionRequest, CompletionsClient, CompletionsConfig,
};

#[test]
fn http_request_targets_completions_endpoint() {
    let config = CompletionsConfig::new("https://api.example.com/v1/", "model-x");
    let client = CompletionsClient::new(config).expect("client");
    let request = ChatCompletionRequest::for_turn(
        "model-x",
        "system",
        &[ChatMessage::user("a"), ChatMessage::model("b")],
        "c",
    )
    .streaming();

    let http_request = client
        .build_request(&request)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(
        http_request.url().as_str(),
        normalize_completions_url("https://api.example.com/v1")
    );
    assert_eq!(http_request.method(), "POST");
    assert_eq!(
        http_request
            .headers()
            .get("accept")
            .and_then(|value| value.to_str().ok()),
        Some("text/event-stream")
    );
    assert!(http_request.headers().get("authorization").is_none());
}

#[test]
fn http_request_carries_bearer_key_when_configured() {
    let config = CompletionsConfig::new("https://api.example.com/v1", "model-x").with_api_key("k");
    let client = CompletionsClient::new(config).expect("client");
    let request = ChatCompletionRequest::for_turn("model-x", "s", &[], "u");

    let http_request = client
        .build_request(&request)
        .expect("build request")
        .build()
        .expect("request");

    assert_eq!(
        http_request
            .headers()
            .get("authorization")
            .and_then(|value| value.to_str().ok()),
        Some("Bearer k")
    );
    assert_eq!(
        http_request
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("application/json")
    );
}
