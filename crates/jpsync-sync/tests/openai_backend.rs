//! `OpenAiBackend` against a mock chat-completions endpoint.

use std::time::Duration;

use jpsync_sync::{OpenAiBackend, TranslateError, TranslationBackend, Translator};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> OpenAiBackend {
    OpenAiBackend::with_base_url("sk-test", "gpt-4o-mini", Duration::from_secs(5), &server.uri())
        .expect("client builds")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    })
}

#[tokio::test]
async fn translation_is_requested_once_per_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini", "temperature": 0.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("防寒外套")))
        .expect(1)
        .mount(&server)
        .await;

    let translator = Translator::new(Box::new(backend(&server)), "zh-TW");
    let first = translator
        .translate("防寒ジャケット", "ja", "zh-TW")
        .await
        .unwrap();
    let second = translator
        .translate("防寒ジャケット", "ja", "zh-TW")
        .await
        .unwrap();

    assert_eq!(first, "防寒外套");
    assert_eq!(second, first);
}

#[tokio::test]
async fn fenced_reply_is_unwrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("```\n鯊魚連帽衫\n```")))
        .mount(&server)
        .await;

    let out = backend(&server)
        .translate("シャークパーカー", "ja", "zh-TW")
        .await
        .unwrap();
    assert_eq!(out, "鯊魚連帽衫");
}

#[tokio::test]
async fn provider_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = backend(&server)
        .translate("防寒ジャケット", "ja", "zh-TW")
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::Unavailable { .. }));
}

#[tokio::test]
async fn empty_choices_are_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = backend(&server)
        .translate("防寒ジャケット", "ja", "zh-TW")
        .await
        .unwrap_err();
    assert!(matches!(err, TranslateError::Unavailable { .. }));
}
