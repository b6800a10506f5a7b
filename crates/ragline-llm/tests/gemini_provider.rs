//! Gemini generation client tests against a local mock server

use ragline_common::{RequestContext, TraceId};
use ragline_config::{LlmConfig, RagConfig};
use ragline_llm::{GeminiProvider, LlmProvider};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(base_url: String) -> GeminiProvider {
    let llm = LlmConfig {
        base_url,
        api_key: "test-key".into(),
        model: "gemini-test".into(),
    };
    let rag = RagConfig {
        pipeline_timeout: Duration::from_secs(30),
        cache_similarity_cutoff: 0.97,
        search_limit: 3,
        history_limit: 5,
        system_instruction: "stay factual".into(),
    };
    GeminiProvider::new(llm, &rag)
}

#[tokio::test]
async fn generate_returns_the_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .and(body_partial_json(serde_json::json!({
            "systemInstruction": {"parts": [{"text": "stay factual"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "final answer"}]}}]
        })))
        .mount(&server)
        .await;

    let ctx = RequestContext::detached(TraceId::new());
    let answer = provider(server.uri())
        .generate(&ctx, "q", &["Content: a, DocumentName: d1".into()], &[])
        .await
        .expect("generate");
    assert_eq!(answer, "final answer");
}

#[tokio::test]
async fn provider_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let ctx = RequestContext::detached(TraceId::new());
    assert!(provider(server.uri()).generate(&ctx, "q", &[], &[]).await.is_err());
}

#[tokio::test]
async fn empty_candidate_list_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": []
        })))
        .mount(&server)
        .await;

    let ctx = RequestContext::detached(TraceId::new());
    assert!(provider(server.uri()).generate(&ctx, "q", &[], &[]).await.is_err());
}
