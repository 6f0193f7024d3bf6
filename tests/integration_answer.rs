#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// HTTP boundary tests for answer generation against a mock
// chat-completions endpoint.

use cet_advisor::answer::{AnswerGenerator, GenerationOptions};
use cet_advisor::config::LlmConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server: &MockServer) -> AnswerGenerator {
    let endpoint = url::Url::parse(&format!("{}/api/v1/chat/completions", server.uri()))
        .expect("mock endpoint URL");
    AnswerGenerator::new(&LlmConfig::default())
        .with_endpoint(endpoint)
        .with_api_key(Some("test-key".to_string()))
}

fn options() -> GenerationOptions {
    GenerationOptions::from_config(&LlmConfig::default())
}

#[tokio::test(flavor = "multi_thread")]
async fn returns_trimmed_answer_on_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "  Acme Tech is the best fit.  "}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let answer = generator.generate_answer(
        "Which college fits a 5000 rank?",
        "Acme Tech | CSE | GM | Cutoff: 4500 | Exam: KCET | Year: 2024 | Avg Package: 6.5",
        &options(),
    );

    assert_eq!(answer, "Acme Tech is the best fit.");
}

#[tokio::test(flavor = "multi_thread")]
async fn identical_questions_hit_the_cache() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Answer"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let first = generator.generate_answer("question", "context", &options());
    let second = generator.generate_answer("question", "context", &options());

    assert_eq!(first, "Answer");
    assert_eq!(first, second);
    assert_eq!(generator.cached_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn different_options_bypass_the_cache() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Answer"}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    generator.generate_answer("question", "context", &options());

    let mut changed = options();
    changed.max_tokens = 64;
    generator.generate_answer("question", "context", &changed);

    assert_eq!(generator.cached_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_response_surfaces_raw_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"unexpected": "shape"})),
        )
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let answer = generator.generate_answer("question", "context", &options());

    assert!(answer.contains("Unexpected API response"));
    assert!(answer.contains("unexpected"));
    // Failures are never cached.
    assert_eq!(generator.cached_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_error_becomes_readable_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let answer = generator.generate_answer("question", "context", &options());

    assert!(answer.contains("Request failed"));
    assert!(answer.contains("502"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_credential_makes_no_network_call() {
    let server = MockServer::start().await;

    // No mock mounted: any request would fail the expect(0) below.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let generator = generator_for(&server).with_api_key(None);
    let answer = generator.generate_answer("question", "context", &options());

    assert!(answer.contains("API key missing"));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_context_makes_no_network_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let answer = generator.generate_answer("question", "   ", &options());

    assert_eq!(answer, "⚠️ No context available to answer the question.");
}
