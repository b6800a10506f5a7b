//! Cancellation-aware request context
//!
//! Every call into an external collaborator (embedder, LLM, vector store,
//! job/message store) takes a [`RequestContext`] so that shutdown and
//! per-job deadlines propagate to in-flight I/O.

use crate::trace::TraceId;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Trace id plus cancellation token, passed through the whole job pipeline.
///
/// Cloning is cheap; child contexts share the same cancellation lineage.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: TraceId,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(trace_id: TraceId, cancel: CancellationToken) -> Self {
        Self { trace_id, cancel }
    }

    /// Context that can only be cancelled explicitly. Intended for tests.
    pub fn detached(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            cancel: CancellationToken::new(),
        }
    }

    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// Run `fut` until it completes or this context is cancelled.
    ///
    /// Returns `None` when cancellation won; callers map that to their own
    /// error type.
    pub async fn run<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        self.cancel.run_until_cancelled(fut).await
    }
}

#[cfg(test)]
mod tests {
    use super::{CancellationToken, RequestContext};
    use crate::trace::TraceId;

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let ctx = RequestContext::detached(TraceId::new());
        let out = ctx.run(async { 7 }).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test]
    async fn run_yields_none_once_cancelled() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new(TraceId::new(), token.clone());
        token.cancel();
        let out = ctx.run(std::future::pending::<()>()).await;
        assert!(out.is_none());
    }
}
