//! The ingest path: detect, bootstrap, extract, chunk, embed, upsert
//!
//! The returned job is authoritative: the caller persists exactly what the
//! pipeline hands back.

use crate::chunker::prepare_chunks;
use crate::detect::doc_type_for_path;
use crate::error::IngestResult;
use crate::extract::extract_text;
use chrono::Utc;
use ragline_common::RequestContext;
use ragline_config::{EmbeddingConfig, VectorConfig};
use ragline_embeddings::Embedder;
use ragline_jobs::{Job, JobStatus, JobStep};
use ragline_vector_data::{DocChunk, DocType, Document, VectorStore};
use std::sync::Arc;
use tracing::{debug, error, info};

/// The slice of configuration the ingest path needs
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub collection: String,
    pub batch_size: usize,
    /// Past this many chunks the embedder runs a long-poll batch job
    pub long_poll_threshold: usize,
    pub embedding_model: String,
}

impl IngestOptions {
    pub fn from_config(embedding: &EmbeddingConfig, vector: &VectorConfig) -> Self {
        Self {
            collection: vector.document_collection.clone(),
            batch_size: embedding.batch_size,
            long_poll_threshold: embedding.long_poll_threshold,
            embedding_model: embedding.model.clone(),
        }
    }
}

/// Run the whole ingest pipeline for one job.
///
/// Failures set the job's status to Error and return it; classification of
/// the error record happens in the query/ingest service that owns the job.
pub async fn process_document_ingestion(
    ctx: &RequestContext,
    mut job: Job,
    embedder: &Arc<dyn Embedder>,
    store: &Arc<dyn VectorStore>,
    options: &IngestOptions,
) -> Job {
    job.step = JobStep::IngestProcessing;

    let Some(payload) = job.ingest().cloned() else {
        error!(trace_id = %ctx.trace_id(), job_id = %job.id, "ingest job without ingest payload");
        job.status = JobStatus::Error;
        return job;
    };
    debug!(
        trace_id = %ctx.trace_id(),
        job_id = %job.id,
        doc = %payload.doc_name,
        path = %payload.source_path.display(),
        "processing document"
    );

    if let Err(e) = store.ensure_collection(ctx, &options.collection).await {
        error!(trace_id = %ctx.trace_id(), error = %e, "collection bootstrap failed");
        job.status = JobStatus::Error;
        return job;
    }

    let doc_type = doc_type_for_path(&payload.source_path);
    if doc_type == DocType::Unsupported {
        error!(
            trace_id = %ctx.trace_id(),
            path = %payload.source_path.display(),
            "unsupported document type"
        );
        job.status = JobStatus::Error;
        return job;
    }

    let doc = Document {
        id: job.id.clone(),
        name: payload.doc_name.clone(),
        ingested_at: Utc::now(),
        content_type: doc_type,
    };

    let pages = match extract_text(&payload.source_path, doc_type).await {
        Ok(pages) => pages,
        Err(e) => {
            error!(trace_id = %ctx.trace_id(), error = %e, "document extraction failed");
            job.status = JobStatus::Error;
            return job;
        }
    };
    debug!(trace_id = %ctx.trace_id(), pages = pages.len(), "extracted raw pages");

    let chunks = prepare_chunks(&pages, &doc, &options.embedding_model);
    debug!(trace_id = %ctx.trace_id(), chunks = chunks.len(), "prepared chunks");

    if let Err(e) = batch_ingest(ctx, &chunks, embedder, store, options).await {
        error!(trace_id = %ctx.trace_id(), error = %e, "batched ingest failed");
        job.status = JobStatus::Error;
        return job;
    }

    // Best-effort spool cleanup; the index already holds the content.
    if let Err(e) = tokio::fs::remove_file(&payload.source_path).await {
        error!(trace_id = %ctx.trace_id(), error = %e, "failed to remove spooled upload");
    }

    info!(trace_id = %ctx.trace_id(), job_id = %job.id, "document ingested");
    job.status = JobStatus::Complete;
    job.step = JobStep::Complete;
    job
}

/// Embed and upsert `chunks` in bounded batches.
///
/// # Errors
///
/// Any failed batch aborts the whole ingest; the caller marks the job
/// failed. The chunk/vector length invariant is enforced by the store.
pub async fn batch_ingest(
    ctx: &RequestContext,
    chunks: &[DocChunk],
    embedder: &Arc<dyn Embedder>,
    store: &Arc<dyn VectorStore>,
    options: &IngestOptions,
) -> IngestResult<()> {
    // Only genuinely huge documents justify the long-poll batch job.
    let long_poll = chunks.len() > options.long_poll_threshold;
    if long_poll {
        debug!(trace_id = %ctx.trace_id(), chunks = chunks.len(), "huge dataset, using long-poll embedding");
    }

    for batch in chunks.chunks(options.batch_size) {
        let non_empty: Vec<DocChunk> = batch.iter().filter(|c| !c.text.is_empty()).cloned().collect();
        if non_empty.is_empty() {
            continue;
        }
        let texts: Vec<String> = non_empty.iter().map(|c| c.text.clone()).collect();

        debug!(
            trace_id = %ctx.trace_id(),
            batch = non_empty.len(),
            "embedding chunk batch"
        );
        let vectors = embedder.embed_batch(ctx, &texts, long_poll).await?;
        store
            .upsert_batch(ctx, &options.collection, &non_empty, &vectors)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{IngestOptions, batch_ingest, process_document_ingestion};
    use chrono::Utc;
    use ragline_common::{RequestContext, TraceId};
    use ragline_embeddings::Embedder;
    use ragline_embeddings::mock::MockEmbedder;
    use ragline_jobs::{Job, JobStatus};
    use ragline_vector_data::{DocChunk, DocType, Document, MockVectorStore, VectorStore};
    use std::io::Write;
    use std::sync::Arc;

    fn options() -> IngestOptions {
        IngestOptions {
            collection: "docs".into(),
            batch_size: 100,
            long_poll_threshold: 1_000_000,
            embedding_model: "test-model".into(),
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::detached(TraceId::new())
    }

    fn chunk(text: &str) -> DocChunk {
        DocChunk {
            doc: Document {
                id: "doc-1".into(),
                name: "d".into(),
                ingested_at: Utc::now(),
                content_type: DocType::Docx,
            },
            chunk_id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            page_num: 1,
            page_order: 0,
            embedding_model: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn batches_of_one_hundred_and_the_remainder() {
        let chunks: Vec<DocChunk> = (0..150).map(|_| chunk("content")).collect();
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::returning(vec![0.1]));
        let store = Arc::new(MockVectorStore::new());
        let store_dyn: Arc<dyn VectorStore> = Arc::clone(&store) as Arc<dyn VectorStore>;

        batch_ingest(&ctx(), &chunks, &embedder, &store_dyn, &options())
            .await
            .expect("batch ingest");

        let upserts = store.upserts();
        assert_eq!(upserts.len(), 2);
        assert_eq!(upserts[0].1, 100);
        assert_eq!(upserts[1].1, 50);
    }

    #[tokio::test]
    async fn failing_upsert_aborts_the_ingest() {
        let chunks = vec![chunk("hi")];
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::returning(vec![0.1]));
        let store: Arc<dyn VectorStore> = Arc::new(MockVectorStore::new().failing_upsert());

        assert!(batch_ingest(&ctx(), &chunks, &embedder, &store, &options())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn text_upload_flows_to_a_complete_job_and_removes_the_spool_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(file, "hello world").expect("write");
        drop(file);

        let job = Job::new_ingest(TraceId::new(), "notes.txt".into(), path.clone());
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::returning(vec![0.1]));
        let store = Arc::new(MockVectorStore::new());
        let store_dyn: Arc<dyn VectorStore> = Arc::clone(&store) as Arc<dyn VectorStore>;

        let result =
            process_document_ingestion(&ctx(), job, &embedder, &store_dyn, &options()).await;

        assert_eq!(result.status, JobStatus::Complete);
        assert_eq!(store.ensured(), vec!["docs".to_owned()]);
        assert_eq!(store.upserts(), vec![("docs".to_owned(), 1)]);
        assert!(!path.exists(), "spool file should be removed after ingest");
    }

    #[tokio::test]
    async fn unsupported_upload_fails_without_extraction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("image.png");
        std::fs::write(&path, b"png bytes").expect("write");

        let job = Job::new_ingest(TraceId::new(), "image.png".into(), path.clone());
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::returning(vec![0.1]));
        let store = Arc::new(MockVectorStore::new());
        let store_dyn: Arc<dyn VectorStore> = Arc::clone(&store) as Arc<dyn VectorStore>;

        let result =
            process_document_ingestion(&ctx(), job, &embedder, &store_dyn, &options()).await;

        assert_eq!(result.status, JobStatus::Error);
        assert!(store.upserts().is_empty());
        assert!(path.exists(), "failed ingest keeps the spool file");
    }

    #[tokio::test]
    async fn collection_bootstrap_failure_fails_the_job() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"content").expect("write");

        let job = Job::new_ingest(TraceId::new(), "notes.txt".into(), path);
        let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::returning(vec![0.1]));
        let store: Arc<dyn VectorStore> = Arc::new(MockVectorStore::new().failing_ensure());

        let result = process_document_ingestion(&ctx(), job, &embedder, &store, &options()).await;
        assert_eq!(result.status, JobStatus::Error);
    }
}
