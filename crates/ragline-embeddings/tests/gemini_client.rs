//! Gemini embedding client tests against a local mock server

use ragline_common::{RequestContext, TraceId};
use ragline_config::EmbeddingConfig;
use ragline_embeddings::{Embedder, GeminiEmbedder};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        base_url,
        api_key: "test-key".into(),
        model: "gemini-embedding-001".into(),
        output_dimension: 3,
        batch_size: 100,
        long_poll_threshold: 1_000_000,
        batch_poll_interval: Duration::from_millis(10),
        rate_limit_backoff: Duration::from_millis(10),
    }
}

fn ctx() -> RequestContext {
    RequestContext::detached(TraceId::new())
}

#[tokio::test]
async fn embed_returns_the_provider_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": {"values": [0.1, 0.2, 0.3]}
        })))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(config(server.uri()));
    let vector = embedder.embed(&ctx(), "what is rust").await.expect("embed");
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn inline_batch_preserves_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [{"values": [1.0, 0.0, 0.0]}, {"values": [0.0, 1.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(config(server.uri()));
    let vectors = embedder
        .embed_batch(&ctx(), &["first".into(), "second".into()], false)
        .await
        .expect("batch");
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![1.0, 0.0, 0.0]);
    assert_eq!(vectors[1], vec![0.0, 1.0, 0.0]);
}

#[tokio::test]
async fn rate_limited_batch_is_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [{"values": [0.5, 0.5, 0.5]}]
        })))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(config(server.uri()));
    let vectors = embedder
        .embed_batch(&ctx(), &["only".into()], false)
        .await
        .expect("retried batch");
    assert_eq!(vectors, vec![vec![0.5, 0.5, 0.5]]);
}

#[tokio::test]
async fn provider_error_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(config(server.uri()));
    assert!(embedder.embed(&ctx(), "q").await.is_err());
}

#[tokio::test]
async fn long_poll_batch_waits_for_success_and_maps_failed_items_to_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/v1beta/models/gemini-embedding-001:asyncBatchEmbedContent",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "batches/job-1",
            "state": "JOB_STATE_PENDING"
        })))
        .mount(&server)
        .await;
    // First poll still running, second poll terminal.
    Mock::given(method("GET"))
        .and(path("/v1beta/batches/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "batches/job-1",
            "state": "JOB_STATE_RUNNING"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/batches/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "batches/job-1",
            "state": "JOB_STATE_SUCCEEDED",
            "dest": {
                "inlinedEmbedContentResponses": [
                    {"response": {"embedding": {"values": [0.9, 0.9, 0.9]}}},
                    {"error": {"message": "item failed"}}
                ]
            }
        })))
        .mount(&server)
        .await;

    let embedder = GeminiEmbedder::new(config(server.uri()));
    let vectors = embedder
        .embed_batch(&ctx(), &["a".into(), "b".into()], true)
        .await
        .expect("long poll");
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.9, 0.9, 0.9]);
    assert!(vectors[1].is_empty(), "failed batch item maps to empty embedding");
}
