//! In-memory mock backend for tests
//!
//! Records every write and serves canned search/cache results so pipeline
//! tests can run without a Qdrant server.

use crate::chunk::DocChunk;
use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::{SearchHit, VectorStore};
use async_trait::async_trait;
use ragline_common::RequestContext;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockVectorStore {
    hits: Vec<SearchHit>,
    cached: Option<String>,
    fail_search: bool,
    fail_ensure: bool,
    fail_upsert: bool,
    /// (collection, batch size) per upsert call
    upserts: Mutex<Vec<(String, usize)>>,
    /// (id, answer) per cache write
    cache_puts: Mutex<Vec<(String, String)>>,
    ensured: Mutex<Vec<String>>,
}

impl MockVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hits(mut self, hits: Vec<SearchHit>) -> Self {
        self.hits = hits;
        self
    }

    pub fn with_cached_answer(mut self, answer: impl Into<String>) -> Self {
        self.cached = Some(answer.into());
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn failing_ensure(mut self) -> Self {
        self.fail_ensure = true;
        self
    }

    pub fn failing_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    /// Convenience hit with every payload field filled in
    pub fn hit(doc_name: &str, content: &str) -> SearchHit {
        SearchHit {
            content: content.to_owned(),
            doc_name: doc_name.to_owned(),
            page_num: 1,
            chunk_order: 0,
            chunk_id: "chunk-1".to_owned(),
            ingested_at: 1_700_000_000,
            source_doc_id: "doc-1".to_owned(),
            similarity: 0.9,
        }
    }

    pub fn upserts(&self) -> Vec<(String, usize)> {
        self.upserts.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn cache_puts(&self) -> Vec<(String, String)> {
        self.cache_puts.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn ensured(&self) -> Vec<String> {
        self.ensured.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for MockVectorStore {
    async fn search(&self, _ctx: &RequestContext, _query: &[f32]) -> VectorDataResult<Vec<SearchHit>> {
        if self.fail_search {
            return Err(VectorDataError::Storage("mock search failure".into()));
        }
        Ok(self.hits.clone())
    }

    async fn cached_answer(
        &self,
        _ctx: &RequestContext,
        _query: &[f32],
    ) -> VectorDataResult<Option<String>> {
        Ok(self.cached.clone())
    }

    async fn save_to_cache(
        &self,
        _ctx: &RequestContext,
        id: &str,
        _vector: &[f32],
        answer: &str,
    ) -> VectorDataResult<()> {
        if let Ok(mut puts) = self.cache_puts.lock() {
            puts.push((id.to_owned(), answer.to_owned()));
        }
        Ok(())
    }

    async fn ensure_collection(&self, _ctx: &RequestContext, collection: &str) -> VectorDataResult<()> {
        if self.fail_ensure {
            return Err(VectorDataError::Collection("mock ensure failure".into()));
        }
        if let Ok(mut ensured) = self.ensured.lock() {
            ensured.push(collection.to_owned());
        }
        Ok(())
    }

    async fn upsert_batch(
        &self,
        _ctx: &RequestContext,
        collection: &str,
        chunks: &[DocChunk],
        vectors: &[Vec<f32>],
    ) -> VectorDataResult<()> {
        if self.fail_upsert {
            return Err(VectorDataError::Storage("mock upsert failure".into()));
        }
        if chunks.len() != vectors.len() {
            return Err(VectorDataError::BatchMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        if let Ok(mut upserts) = self.upserts.lock() {
            upserts.push((collection.to_owned(), chunks.len()));
        }
        Ok(())
    }
}
