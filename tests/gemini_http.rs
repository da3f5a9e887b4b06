//! The native Gemini client end to end against a local mock server.

mod common;

use common::*;
use medical_facilitator::{
    FacilitatorConfig, GeminiClient, GenerationRequest, GenerativeModel, NoopObserver,
    Orchestrator, RunError, RunRequest, UpstreamError,
};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const ENDPOINT: &str = "/models/gemini-2.5-flash:generateContent";

fn reply(text: &str) -> String {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 50, "candidatesTokenCount": 20}
    })
    .to_string()
}

fn orchestrator(server: &ServerGuard) -> Orchestrator {
    init_tracing();
    let config = FacilitatorConfig::builder()
        .api_key("test-key")
        .base_url(server.url())
        .save_delay_ms(0)
        .build()
        .unwrap();
    Orchestrator::new(&config).unwrap()
}

fn request() -> RunRequest {
    RunRequest::new(Some(jpeg()), JANE_DOE).unwrap()
}

#[tokio::test]
async fn two_calls_with_key_header_and_inline_image() {
    let mut server = Server::new_async().await;
    let extract = server
        .mock("POST", ENDPOINT)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Data Retriever Agent".into()),
            Matcher::Regex("Jane Doe, Age 45".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply(STRUCTURED))
        .expect(1)
        .create_async()
        .await;
    let synthesize = server
        .mock("POST", ENDPOINT)
        .match_header("x-goog-api-key", "test-key")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("Medical Facilitator Agent".into()),
            Matcher::Regex(r#""inlineData":\{"mimeType":"image/jpeg""#.into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(reply(REPORT))
        .expect(1)
        .create_async()
        .await;

    let output = orchestrator(&server)
        .run(&request(), &NoopObserver)
        .await
        .unwrap();

    extract.assert_async().await;
    synthesize.assert_async().await;
    assert_eq!(output.structured_data, STRUCTURED);
    assert_eq!(output.final_report, REPORT);
    assert_eq!(output.stats.input_tokens, 100);
    assert_eq!(output.stats.output_tokens, 40);
}

#[tokio::test]
async fn rate_limit_stops_run_at_extraction() {
    let mut server = Server::new_async().await;
    let limited = server
        .mock("POST", ENDPOINT)
        .with_status(429)
        .with_header("retry-after", "30")
        .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#)
        .expect(1)
        .create_async()
        .await;

    let err = orchestrator(&server)
        .run(&request(), &NoopObserver)
        .await
        .unwrap_err();

    limited.assert_async().await;
    assert!(matches!(err, RunError::Extraction { .. }));
    assert!(matches!(
        err.cause(),
        Some(UpstreamError::RateLimited {
            retry_after_secs: Some(30),
            ..
        })
    ));
}

#[tokio::test]
async fn safety_block_is_synthesis_failure() {
    let mut server = Server::new_async().await;
    let _extract = server
        .mock("POST", ENDPOINT)
        .match_body(Matcher::Regex("Data Retriever Agent".into()))
        .with_status(200)
        .with_body(reply(STRUCTURED))
        .create_async()
        .await;
    let _blocked = server
        .mock("POST", ENDPOINT)
        .match_body(Matcher::Regex("inlineData".into()))
        .with_status(200)
        .with_body(json!({"promptFeedback": {"blockReason": "PROHIBITED_CONTENT"}}).to_string())
        .create_async()
        .await;

    let err = orchestrator(&server)
        .run(&request(), &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Synthesis { .. }));
    assert_eq!(
        err.cause(),
        Some(&UpstreamError::ContentBlocked {
            reason: "PROHIBITED_CONTENT".into()
        })
    );
}

#[tokio::test]
async fn auth_and_server_errors() {
    let req = GenerationRequest::new("gemini-2.5-flash").text("hello");

    let mut server = Server::new_async().await;
    let client = GeminiClient::new("bad-key", server.url(), None).unwrap();
    let _forbidden = server
        .mock("POST", ENDPOINT)
        .match_header("x-goog-api-key", "bad-key")
        .with_status(403)
        .with_body("API key not valid")
        .create_async()
        .await;
    let err = client.generate(&req).await.unwrap_err();
    assert_eq!(
        err,
        UpstreamError::Auth {
            status: 403,
            detail: "API key not valid".into()
        }
    );

    let mut server = Server::new_async().await;
    let client = GeminiClient::new("k", server.url(), None).unwrap();
    let _overloaded = server
        .mock("POST", ENDPOINT)
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;
    let err = client.generate(&req).await.unwrap_err();
    assert!(matches!(err, UpstreamError::Api { status: 503, .. }));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_body("<html>proxy error</html>")
        .create_async()
        .await;

    let client = GeminiClient::new("k", server.url(), Some(5)).unwrap();
    let err = client
        .generate(&GenerationRequest::new("gemini-2.5-flash").text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)), "got {err:?}");
}
