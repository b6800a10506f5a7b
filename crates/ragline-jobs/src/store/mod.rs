//! Persistence contracts for jobs and chat history
//!
//! Redis is the primary backend; the in-memory variants carry identical
//! semantics minus persistence and TTL and are selected at bootstrap when
//! Redis is unreachable.

pub mod memory;
pub mod redis;

pub use memory::{InMemoryJobStore, InMemoryMessageStore};
pub use redis::{RedisJobStore, RedisMessageStore};

use crate::error::StoreResult;
use crate::model::{Job, JobPayload};
use async_trait::async_trait;
use ragline_common::RequestContext;

/// How many prior exchanges the history read returns, most-recent first.
pub const HISTORY_LIMIT: usize = 5;

/// Key/value persistence for job records.
///
/// Values are serialized JSON under the job id with a bounded TTL. A missing
/// id is `Ok(None)`; only backend failures surface as errors.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save_job(&self, ctx: &RequestContext, job: &Job) -> StoreResult<()>;
    async fn get_job(&self, ctx: &RequestContext, job_id: &str) -> StoreResult<Option<Job>>;
    async fn delete_job(&self, ctx: &RequestContext, job_id: &str) -> StoreResult<()>;
}

/// Append-only chat history keyed by chat id.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Whether the chat id refers to a known conversation
    async fn validate_chat_id(&self, ctx: &RequestContext, chat_id: &str) -> bool;

    /// Register a fresh conversation under `chat_id`
    async fn init_new_chat(&self, ctx: &RequestContext, chat_id: &str) -> StoreResult<()>;

    /// Append one exchange. Unknown ids are an error on the persistent
    /// variant and a silent no-op on the in-memory variant.
    async fn try_save_chat(
        &self,
        ctx: &RequestContext,
        chat_id: &str,
        payload: &JobPayload,
    ) -> StoreResult<()>;

    /// Last [`HISTORY_LIMIT`] serialized exchanges, most-recent first
    async fn get_message_history(
        &self,
        ctx: &RequestContext,
        chat_id: &str,
    ) -> StoreResult<Vec<String>>;
}
