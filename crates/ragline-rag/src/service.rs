//! Query pipeline state machine and the ingest entry point
//!
//! The query path walks `EmbeddingAPI -> CacheCall -> VectorDB -> LLM`
//! under a nested pipeline deadline, classifying failures per step. The
//! cache lookup deliberately runs under the parent (worker) deadline only,
//! so a stale-but-fast hit can still answer after the recompute budget is
//! gone.

use async_trait::async_trait;
use ragline_common::RequestContext;
use ragline_config::RagConfig;
use ragline_embeddings::Embedder;
use ragline_ingest::{IngestOptions, process_document_ingestion};
use ragline_jobs::{Job, JobStatus, JobStep};
use ragline_llm::LlmProvider;
use ragline_vector_data::{SearchHit, VectorStore};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// The worker only ever calls this contract; providers stay swappable
/// behind it.
#[async_trait]
pub trait RagService: Send + Sync {
    /// Run the query pipeline. The returned job is authoritative.
    async fn process_query(&self, ctx: &RequestContext, job: Job, history: Vec<String>) -> Job;

    /// Run the ingestion pipeline. The returned job is authoritative.
    async fn ingest_document(&self, ctx: &RequestContext, job: Job) -> Job;
}

pub struct Rag {
    vector: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    config: RagConfig,
    ingest_options: IngestOptions,
}

impl Rag {
    pub fn new(
        vector: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        config: RagConfig,
        ingest_options: IngestOptions,
    ) -> Self {
        Self {
            vector,
            llm,
            embedder,
            config,
            ingest_options,
        }
    }
}

/// Classified pipeline failure: log the classification, mark the job failed
/// with the generic retryable error the status endpoint exposes.
fn classify_failure(mut job: Job, classification: &str, detail: &str) -> Job {
    error!(classification, detail, job_id = %job.id, "pipeline step failed");
    job.fail(500, "Internal Server Error", true);
    job
}

/// Run one pipeline step with latency recording and an optional nested
/// deadline. `None` means the step only answers to the parent deadline.
async fn run_step<T, E, F>(
    service: &'static str,
    deadline: Option<Instant>,
    fut: F,
) -> Result<T, String>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = match deadline {
        Some(at) => match tokio::time::timeout_at(at, fut).await {
            Ok(inner) => inner.map_err(|e| e.to_string()),
            Err(_) => Err("pipeline deadline exceeded".to_owned()),
        },
        None => fut.await.map_err(|e| e.to_string()),
    };
    metrics::histogram!("dependency_latency_seconds", "service" => service)
        .record(start.elapsed().as_secs_f64());
    result
}

/// One context line per hit plus its five provenance tags, in payload order.
fn fold_hits(hits: &[SearchHit]) -> (Vec<String>, Vec<String>) {
    let mut context_lines = Vec::with_capacity(hits.len());
    let mut sources = Vec::with_capacity(hits.len() * 5);
    for hit in hits {
        context_lines.push(format!(
            "Content: {}, DocumentName: {}",
            hit.content, hit.doc_name
        ));
        sources.push(format!("page_num:{}", hit.page_num));
        sources.push(format!("chunk_order:{}", hit.chunk_order));
        sources.push(format!("chunk_id:{}", hit.chunk_id));
        sources.push(format!("ingested_at:{}", hit.ingested_at));
        sources.push(format!("source_doc_id:{}", hit.source_doc_id));
    }
    (context_lines, sources)
}

#[async_trait]
impl RagService for Rag {
    async fn process_query(&self, ctx: &RequestContext, mut job: Job, history: Vec<String>) -> Job {
        let deadline = Instant::now() + self.config.pipeline_timeout;
        let question = job
            .query()
            .map(|q| q.question.clone())
            .unwrap_or_default();

        // Embedding
        job.step = JobStep::EmbeddingApi;
        let embedding = match run_step(
            "embedding",
            Some(deadline),
            self.embedder.embed(ctx, &question),
        )
        .await
        {
            Ok(vector) => vector,
            Err(detail) => return classify_failure(job, "EMBEDDING_FAILURE", &detail),
        };

        // Cache lookup is best-effort: transport errors count as misses, and
        // it runs without the nested deadline on purpose.
        job.step = JobStep::CacheCall;
        let cached = run_step("cache_lookup", None, self.vector.cached_answer(ctx, &embedding))
            .await
            .unwrap_or_else(|detail| {
                error!(detail, "cache lookup failed, treating as miss");
                None
            });
        if let Some(answer) = cached {
            info!(trace_id = %ctx.trace_id(), job_id = %job.id, "answered from semantic cache");
            if let Some(query) = job.query_mut() {
                query.answer = Some(answer);
            }
            job.step = JobStep::Complete;
            return job;
        }

        // Vector search
        job.step = JobStep::VectorDb;
        let hits = match run_step(
            "vector_search",
            Some(deadline),
            self.vector.search(ctx, &embedding),
        )
        .await
        {
            Ok(hits) => hits,
            Err(detail) => return classify_failure(job, "VECTOR_DB_FAILURE", &detail),
        };
        let (context_lines, sources) = fold_hits(&hits);
        if let Some(query) = job.query_mut() {
            query.sources = sources;
        }

        // LLM generation
        job.step = JobStep::Llm;
        let recent = history
            .iter()
            .take(self.config.history_limit)
            .cloned()
            .collect::<Vec<_>>();
        let answer = match run_step(
            "llm_generation",
            Some(deadline),
            self.llm.generate(ctx, &question, &context_lines, &recent),
        )
        .await
        {
            Ok(answer) => answer,
            Err(detail) => return classify_failure(job, "LLM_GENERATION_FAILURE", &detail),
        };

        // Background cache fill; its outcome never touches the job.
        {
            let vector = Arc::clone(&self.vector);
            let fill_ctx = ctx.clone();
            let query_vector = embedding;
            let cached_answer = answer.clone();
            tokio::spawn(async move {
                let id = Uuid::new_v4().to_string();
                if let Err(e) = vector
                    .save_to_cache(&fill_ctx, &id, &query_vector, &cached_answer)
                    .await
                {
                    error!(error = %e, "failed to save answer to semantic cache");
                }
            });
        }

        debug!(trace_id = %ctx.trace_id(), job_id = %job.id, "query pipeline complete");
        if let Some(query) = job.query_mut() {
            query.answer = Some(answer);
        }
        job.step = JobStep::Complete;
        job
    }

    async fn ingest_document(&self, ctx: &RequestContext, job: Job) -> Job {
        let start = std::time::Instant::now();
        let result = process_document_ingestion(
            ctx,
            job,
            &self.embedder,
            &self.vector,
            &self.ingest_options,
        )
        .await;
        metrics::histogram!("dependency_latency_seconds", "service" => "Document_ingestion")
            .record(start.elapsed().as_secs_f64());

        if result.status == JobStatus::Complete {
            result
        } else {
            classify_failure(result, "INGESTION_FAILURE", "ingest pipeline did not complete")
        }
    }
}
