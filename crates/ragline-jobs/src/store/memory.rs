//! In-memory fallback stores
//!
//! Selected at bootstrap when Redis fails its liveness ping. Same contract
//! as the Redis stores minus persistence and TTL. Readers share, writers
//! are exclusive.

use crate::error::StoreResult;
use crate::model::{Job, JobPayload};
use crate::store::{HISTORY_LIMIT, JobStore, MessageStore};
use async_trait::async_trait;
use ragline_common::RequestContext;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save_job(&self, ctx: &RequestContext, job: &Job) -> StoreResult<()> {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        debug!(trace_id = %ctx.trace_id(), job_id = %job.id, "saved job to memory store");
        Ok(())
    }

    async fn get_job(&self, _ctx: &RequestContext, job_id: &str) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn delete_job(&self, _ctx: &RequestContext, job_id: &str) -> StoreResult<()> {
        self.jobs.write().await.remove(job_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMessageStore {
    chats: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn validate_chat_id(&self, _ctx: &RequestContext, chat_id: &str) -> bool {
        self.chats.read().await.contains_key(chat_id)
    }

    async fn init_new_chat(&self, _ctx: &RequestContext, chat_id: &str) -> StoreResult<()> {
        self.chats.write().await.insert(chat_id.to_owned(), Vec::new());
        Ok(())
    }

    async fn try_save_chat(
        &self,
        ctx: &RequestContext,
        chat_id: &str,
        payload: &JobPayload,
    ) -> StoreResult<()> {
        let mut chats = self.chats.write().await;
        // Unknown chat ids are a silent no-op on the in-memory variant.
        if let Some(history) = chats.get_mut(chat_id) {
            history.push(serde_json::to_string(payload)?);
            debug!(trace_id = %ctx.trace_id(), chat_id, "saved chat exchange to memory store");
        }
        Ok(())
    }

    async fn get_message_history(
        &self,
        _ctx: &RequestContext,
        chat_id: &str,
    ) -> StoreResult<Vec<String>> {
        let chats = self.chats.read().await;
        let Some(history) = chats.get(chat_id) else {
            return Ok(Vec::new());
        };
        let recent = history
            .iter()
            .rev()
            .take(HISTORY_LIMIT)
            .cloned()
            .collect();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryJobStore, InMemoryMessageStore};
    use crate::model::{Job, JobPayload, QueryPayload};
    use crate::store::{JobStore, MessageStore};
    use ragline_common::{RequestContext, TraceId};

    fn ctx() -> RequestContext {
        RequestContext::detached(TraceId::new())
    }

    fn exchange(question: &str, answer: &str) -> JobPayload {
        JobPayload::Query(QueryPayload {
            question: question.to_owned(),
            answer: Some(answer.to_owned()),
            sources: Vec::new(),
        })
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = InMemoryJobStore::new();
        let job = Job::new_query(TraceId::new(), "chat-1".into(), "q".into());

        store.save_job(&ctx(), &job).await.expect("save");
        let found = store.get_job(&ctx(), &job.id).await.expect("get");
        assert_eq!(found.map(|j| j.id), Some(job.id));
    }

    #[tokio::test]
    async fn missing_job_is_none_not_error() {
        let store = InMemoryJobStore::new();
        let found = store.get_job(&ctx(), "ghost-id").await.expect("get");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let store = InMemoryJobStore::new();
        let job = Job::new_query(TraceId::new(), "chat-1".into(), "q".into());
        store.save_job(&ctx(), &job).await.expect("save");
        store.delete_job(&ctx(), &job.id).await.expect("delete");
        assert!(store.get_job(&ctx(), &job.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn history_returns_last_five_most_recent_first() {
        let store = InMemoryMessageStore::new();
        let ctx = ctx();
        store.init_new_chat(&ctx, "chat-1").await.expect("init");
        for i in 0..7 {
            store
                .try_save_chat(&ctx, "chat-1", &exchange(&format!("q{i}"), &format!("a{i}")))
                .await
                .expect("save");
        }

        let history = store.get_message_history(&ctx, "chat-1").await.expect("history");
        assert_eq!(history.len(), 5);
        assert!(history[0].contains("q6"), "newest entry first: {}", history[0]);
        assert!(history[4].contains("q2"));
    }

    #[tokio::test]
    async fn unknown_chat_save_is_a_no_op() {
        let store = InMemoryMessageStore::new();
        let ctx = ctx();
        store
            .try_save_chat(&ctx, "never-initialized", &exchange("q", "a"))
            .await
            .expect("no-op");
        assert!(!store.validate_chat_id(&ctx, "never-initialized").await);
    }
}
