//! Trait abstraction for embedding providers
//!
//! One implementation exists (Gemini REST); the pipeline only ever sees
//! this contract so providers stay swappable without widening the core.

use crate::EmbeddingResult;
use async_trait::async_trait;
use ragline_common::RequestContext;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one query text at the configured output dimensionality.
    async fn embed(&self, ctx: &RequestContext, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embed a batch of chunk texts, preserving input order.
    ///
    /// With `long_poll` set the provider runs a named batch job polled until
    /// a terminal state instead of a single inline RPC; items that fail
    /// inside the batch come back as empty embeddings.
    async fn embed_batch(
        &self,
        ctx: &RequestContext,
        texts: &[String],
        long_poll: bool,
    ) -> EmbeddingResult<Vec<Vec<f32>>>;
}
