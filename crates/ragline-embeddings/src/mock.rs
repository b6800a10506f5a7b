//! Mock embedder for tests across the workspace

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::Embedder;
use async_trait::async_trait;
use ragline_common::RequestContext;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returns a fixed vector for every input, or a canned failure.
pub struct MockEmbedder {
    vector: Vec<f32>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn returning(vector: Vec<f32>) -> Self {
        Self {
            vector,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, _ctx: &RequestContext, _text: &str) -> EmbeddingResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(EmbeddingError::Provider("mock embedding failure".into()));
        }
        Ok(self.vector.clone())
    }

    async fn embed_batch(
        &self,
        _ctx: &RequestContext,
        texts: &[String],
        _long_poll: bool,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(EmbeddingError::Provider("mock embedding failure".into()));
        }
        Ok(texts.iter().map(|_| self.vector.clone()).collect())
    }
}
