//! Query and ingest pipeline scenarios against mock providers

use ragline_common::{RequestContext, TraceId};
use ragline_config::RagConfig;
use ragline_embeddings::Embedder;
use ragline_embeddings::mock::MockEmbedder;
use ragline_ingest::IngestOptions;
use ragline_jobs::{Job, JobStatus, JobStep};
use ragline_llm::LlmProvider;
use ragline_llm::mock::MockLlm;
use ragline_rag::{Rag, RagService};
use ragline_vector_data::{MockVectorStore, VectorStore};
use std::sync::Arc;
use std::time::Duration;

fn rag_config() -> RagConfig {
    RagConfig {
        pipeline_timeout: Duration::from_secs(30),
        cache_similarity_cutoff: 0.97,
        search_limit: 3,
        history_limit: 5,
        system_instruction: "be helpful".into(),
    }
}

fn ingest_options() -> IngestOptions {
    IngestOptions {
        collection: "docs".into(),
        batch_size: 100,
        long_poll_threshold: 1_000_000,
        embedding_model: "test-model".into(),
    }
}

fn service(
    store: Arc<MockVectorStore>,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
) -> Rag {
    Rag::new(
        store as Arc<dyn VectorStore>,
        llm,
        embedder,
        rag_config(),
        ingest_options(),
    )
}

fn query_job() -> Job {
    Job::new_query(TraceId::new(), "chat-1".into(), "test question".into())
}

fn ctx() -> RequestContext {
    RequestContext::detached(TraceId::new())
}

#[tokio::test]
async fn full_pipeline_answers_with_fifteen_source_tags() {
    let store = Arc::new(MockVectorStore::new().with_hits(vec![
        MockVectorStore::hit("d1", "first chunk"),
        MockVectorStore::hit("d1", "second chunk"),
        MockVectorStore::hit("d1", "third chunk"),
    ]));
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::answering("final")),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let result = rag.process_query(&ctx(), query_job(), Vec::new()).await;

    assert_eq!(result.step, JobStep::Complete);
    assert_ne!(result.status, JobStatus::Error);
    let query = result.query().expect("query payload");
    assert_eq!(query.answer.as_deref(), Some("final"));
    assert_eq!(query.sources.len(), 15, "5 tags per hit, 3 hits");
    assert!(query.sources[0].starts_with("page_num:"));
    assert!(query.sources[4].starts_with("source_doc_id:"));
}

#[tokio::test]
async fn cache_hit_short_circuits_before_search_and_generation() {
    let store = Arc::new(MockVectorStore::new().with_cached_answer("cached answer"));
    // A failing LLM proves generation is never reached on a cache hit.
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::failing()),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let result = rag.process_query(&ctx(), query_job(), Vec::new()).await;

    assert_eq!(result.step, JobStep::Complete);
    assert_ne!(result.status, JobStatus::Error);
    let query = result.query().expect("query payload");
    assert_eq!(query.answer.as_deref(), Some("cached answer"));
    assert!(query.sources.is_empty());
}

#[tokio::test]
async fn embedding_failure_is_classified_and_retryable() {
    let store = Arc::new(MockVectorStore::new());
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::answering("unused")),
        Arc::new(MockEmbedder::failing()),
    );

    let result = rag.process_query(&ctx(), query_job(), Vec::new()).await;

    assert_eq!(result.status, JobStatus::Error);
    let error = result.error.expect("error record");
    assert_eq!(error.code, 500);
    assert_eq!(error.message, "Internal Server Error");
    assert!(error.retryable);
}

#[tokio::test]
async fn vector_search_failure_fails_the_job() {
    let store = Arc::new(MockVectorStore::new().failing_search());
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::answering("unused")),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let result = rag.process_query(&ctx(), query_job(), Vec::new()).await;
    assert_eq!(result.status, JobStatus::Error);
    assert!(result.error.expect("error record").retryable);
}

#[tokio::test]
async fn llm_failure_fails_the_job() {
    let store = Arc::new(MockVectorStore::new().with_hits(vec![MockVectorStore::hit("d1", "c")]));
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::failing()),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let result = rag.process_query(&ctx(), query_job(), Vec::new()).await;
    assert_eq!(result.status, JobStatus::Error);
}

#[tokio::test]
async fn successful_generation_fills_the_cache_in_the_background() {
    let store = Arc::new(MockVectorStore::new().with_hits(vec![MockVectorStore::hit("d1", "c")]));
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::answering("final")),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let result = rag.process_query(&ctx(), query_job(), Vec::new()).await;
    assert_ne!(result.status, JobStatus::Error);

    // The fill runs on a detached task; give it a beat.
    let mut tries = 0;
    loop {
        let puts = store.cache_puts();
        if !puts.is_empty() {
            assert_eq!(puts[0].1, "final");
            break;
        }
        tries += 1;
        assert!(tries < 50, "cache fill never happened");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn ingest_success_completes_the_job() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello world").expect("write");

    let store = Arc::new(MockVectorStore::new());
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::answering("unused")),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let job = Job::new_ingest(TraceId::new(), "notes.txt".into(), path);
    let result = rag.ingest_document(&ctx(), job).await;

    assert_eq!(result.status, JobStatus::Complete);
    assert_eq!(store.upserts().len(), 1);
}

#[tokio::test]
async fn ingest_failure_is_classified_and_retryable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello world").expect("write");

    let store = Arc::new(MockVectorStore::new().failing_ensure());
    let rag = service(
        Arc::clone(&store),
        Arc::new(MockLlm::answering("unused")),
        Arc::new(MockEmbedder::returning(vec![0.1])),
    );

    let job = Job::new_ingest(TraceId::new(), "notes.txt".into(), path);
    let result = rag.ingest_document(&ctx(), job).await;

    assert_eq!(result.status, JobStatus::Error);
    let error = result.error.expect("error record");
    assert_eq!(error.code, 500);
    assert!(error.retryable);
}
