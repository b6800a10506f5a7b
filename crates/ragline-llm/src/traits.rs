//! Trait abstraction for LLM providers

use crate::LlmResult;
use async_trait::async_trait;
use ragline_common::RequestContext;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer for `question` grounded in `context_lines`,
    /// optionally prefixed with the most recent `history` exchanges
    /// (most-recent first, as returned by the message store).
    async fn generate(
        &self,
        ctx: &RequestContext,
        question: &str,
        context_lines: &[String],
        history: &[String],
    ) -> LlmResult<String>;
}
