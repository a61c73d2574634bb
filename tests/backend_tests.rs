//! Translation backend client tests against a mock HTTP server

use ramanya_gateway::Error;
use ramanya_gateway::config::AppConfig;
use ramanya_gateway::infrastructure::backend::{
    HttpBackendClient, SuggestionPayload, TranslationRequest, VocabularyTerm,
};
use ramanya_gateway::infrastructure::traits::TranslationBackend;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, max_retries: u32) -> HttpBackendClient {
    HttpBackendClient::new(&AppConfig {
        backend_url: server.uri(),
        translate_max_retries: max_retries,
        retry_base_delay: Duration::from_millis(10),
        translate_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    })
}

#[tokio::test]
async fn test_translate_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .and(body_json(json!({ "message": "Hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "source_language": "English",
            "translation": "ဟဲလိုဝ်"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server, 0)
        .translate(&TranslationRequest::new("Hello"))
        .await
        .unwrap();

    assert_eq!(result.source_language, "English");
    assert_eq!(result.translation, "ဟဲလိုဝ်");
}

#[tokio::test]
async fn test_translate_forwards_vocabulary_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .and(body_json(json!({
            "message": "Hello friend",
            "vocabulary": [{ "original": "Hello", "suggestion": "ဟဲလိုဝ်" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "source_language": "English",
            "translation": "ဟဲလိုဝ် ..."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = TranslationRequest {
        message: "Hello friend".to_owned(),
        vocabulary: Some(vec![VocabularyTerm {
            original: "Hello".to_owned(),
            suggestion: "ဟဲလိုဝ်".to_owned(),
            context: None,
        }]),
    };

    assert!(client_for(&server, 0).translate(&request).await.is_ok());
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "bad input" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server, 3)
        .translate(&TranslationRequest::new("Hello"))
        .await;

    assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "source_language": "Mon",
            "translation": "Hello"
        })))
        .mount(&server)
        .await;

    let result = client_for(&server, 2)
        .translate(&TranslationRequest::new("ဟဲလိုဝ်"))
        .await
        .unwrap();

    assert_eq!(result.source_language, "Mon");
}

#[tokio::test]
async fn test_retries_give_up_with_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let result = client_for(&server, 2)
        .translate(&TranslationRequest::new("Hello"))
        .await;

    assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
}

#[tokio::test]
async fn test_malformed_success_body_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client_for(&server, 0)
        .translate(&TranslationRequest::new("Hello"))
        .await;

    assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
}

#[tokio::test]
async fn test_submit_suggestion_returns_acknowledgment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/suggest"))
        .and(body_json(json!({
            "original": "Hello",
            "suggestion": "ဟဲလိုဝ်",
            "context": ""
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "received" })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client_for(&server, 0)
        .submit_suggestion(&SuggestionPayload {
            original: "Hello".to_owned(),
            suggestion: "ဟဲလိုဝ်".to_owned(),
            context: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(ack["message"], "received");
}
