//! Vector storage contract
//!
//! One implementation exists (Qdrant); the pipelines only see this trait so
//! the backend stays pluggable without widening the core surface.

use crate::VectorDataResult;
use crate::chunk::DocChunk;
use async_trait::async_trait;
use ragline_common::RequestContext;

/// One document hit from the top-k search, with the payload fields the
/// query pipeline turns into a context line and provenance tags.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub content: String,
    pub doc_name: String,
    pub page_num: i64,
    pub chunk_order: i64,
    pub chunk_id: String,
    pub ingested_at: i64,
    pub source_doc_id: String,
    pub similarity: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top-k nearest neighbors from the document collection, with payload.
    async fn search(&self, ctx: &RequestContext, query: &[f32]) -> VectorDataResult<Vec<SearchHit>>;

    /// Semantic-cache lookup: top-1 against the cache collection, a hit only
    /// at or above the similarity cutoff. Misses are `Ok(None)`.
    async fn cached_answer(
        &self,
        ctx: &RequestContext,
        query: &[f32],
    ) -> VectorDataResult<Option<String>>;

    /// Best-effort write-through of a generated answer under a fresh id.
    async fn save_to_cache(
        &self,
        ctx: &RequestContext,
        id: &str,
        vector: &[f32],
        answer: &str,
    ) -> VectorDataResult<()>;

    /// Create the collection with the configured `{dimension, cosine}`
    /// parameters if it does not exist yet. Idempotent.
    async fn ensure_collection(&self, ctx: &RequestContext, collection: &str) -> VectorDataResult<()>;

    /// Upsert one ingest batch. `chunks` and `vectors` must be equal length.
    async fn upsert_batch(
        &self,
        ctx: &RequestContext,
        collection: &str,
        chunks: &[DocChunk],
        vectors: &[Vec<f32>],
    ) -> VectorDataResult<()>;
}
