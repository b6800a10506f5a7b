//! Redis-backed job and message stores
//!
//! One `ConnectionManager` per store (jobs and history live in separate
//! logical databases). All commands run under the caller's request context
//! so shutdown cancels in-flight store I/O.

use crate::error::{StoreError, StoreResult};
use crate::model::{Job, JobPayload};
use crate::store::{HISTORY_LIMIT, JobStore, MessageStore};
use async_trait::async_trait;
use ragline_common::RequestContext;
use ragline_config::StoreConfig;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, error};

const CONNECT_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Sentinel pushed by `init_new_chat` so `EXISTS` can answer chat-id
/// validation before any exchange has been stored.
const CHAT_INIT_SENTINEL: &str = "";

async fn connect(redis_url: &str, db: u8) -> StoreResult<ConnectionManager> {
    let client = redis::Client::open(format!("{redis_url}/{db}"))?;
    let mut manager = ConnectionManager::new(client).await?;

    // A manager can be built while the server is down; prove liveness before
    // the bootstrap commits to this backend.
    let ping_cmd = redis::cmd("PING");
    let ping = ping_cmd.query_async::<String>(&mut manager);
    match tokio::time::timeout(CONNECT_PING_TIMEOUT, ping).await {
        Ok(Ok(_)) => Ok(manager),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(StoreError::Transport("redis ping timed out".into())),
    }
}

/// Job records as JSON values under the job id, TTL-bounded.
pub struct RedisJobStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisJobStore {
    /// Connect and verify the backend is alive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Transport` when Redis is unreachable within the
    /// ping timeout; the bootstrap falls back to the in-memory store then.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let conn = connect(&config.redis_url, config.job_store_db).await?;
        Ok(Self {
            conn,
            ttl: config.job_ttl,
        })
    }

    /// Build from an already-established connection. Intended for tests.
    pub fn with_connection(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn save_job(&self, ctx: &RequestContext, job: &Job) -> StoreResult<()> {
        let data = serde_json::to_string(job)?;
        let mut conn = self.conn.clone();
        let write = conn.set_ex::<_, _, ()>(&job.id, data, self.ttl.as_secs());
        ctx.run(write).await.ok_or(StoreError::Cancelled)??;
        debug!(trace_id = %ctx.trace_id(), job_id = %job.id, "saved job");
        Ok(())
    }

    async fn get_job(&self, ctx: &RequestContext, job_id: &str) -> StoreResult<Option<Job>> {
        let mut conn = self.conn.clone();
        let read = conn.get::<_, Option<String>>(job_id);
        let raw = ctx.run(read).await.ok_or(StoreError::Cancelled)??;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete_job(&self, ctx: &RequestContext, job_id: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let del = conn.del::<_, ()>(job_id);
        ctx.run(del).await.ok_or(StoreError::Cancelled)??;
        debug!(trace_id = %ctx.trace_id(), job_id, "deleted job");
        Ok(())
    }
}

/// Chat history as a Redis list per chat id, TTL refreshed on every append.
pub struct RedisMessageStore {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisMessageStore {
    /// Connect and verify the backend is alive.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Transport` when Redis is unreachable within the
    /// ping timeout.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let conn = connect(&config.redis_url, config.message_store_db).await?;
        Ok(Self {
            conn,
            ttl: config.message_ttl,
        })
    }

    /// Build from an already-established connection. Intended for tests.
    pub fn with_connection(conn: ConnectionManager, ttl: Duration) -> Self {
        Self { conn, ttl }
    }

    async fn push(&self, ctx: &RequestContext, chat_id: &str, value: String) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let append = async {
            conn.rpush::<_, _, ()>(chat_id, value).await?;
            conn.expire::<_, ()>(chat_id, self.ttl.as_secs() as i64).await
        };
        ctx.run(append).await.ok_or(StoreError::Cancelled)??;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for RedisMessageStore {
    async fn validate_chat_id(&self, ctx: &RequestContext, chat_id: &str) -> bool {
        let mut conn = self.conn.clone();
        let check = conn.exists::<_, bool>(chat_id);
        match ctx.run(check).await {
            Some(Ok(found)) => found,
            Some(Err(e)) => {
                error!(trace_id = %ctx.trace_id(), chat_id, error = %e, "chat id lookup failed");
                false
            }
            None => false,
        }
    }

    async fn init_new_chat(&self, ctx: &RequestContext, chat_id: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let reset = conn.del::<_, ()>(chat_id);
        ctx.run(reset).await.ok_or(StoreError::Cancelled)??;
        self.push(ctx, chat_id, CHAT_INIT_SENTINEL.to_owned()).await
    }

    async fn try_save_chat(
        &self,
        ctx: &RequestContext,
        chat_id: &str,
        payload: &JobPayload,
    ) -> StoreResult<()> {
        if !self.validate_chat_id(ctx, chat_id).await {
            return Err(StoreError::UnknownChat(chat_id.to_owned()));
        }
        let serialized = serde_json::to_string(payload)?;
        self.push(ctx, chat_id, serialized).await?;
        debug!(trace_id = %ctx.trace_id(), chat_id, "saved chat exchange");
        Ok(())
    }

    async fn get_message_history(
        &self,
        ctx: &RequestContext,
        chat_id: &str,
    ) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let window = -(HISTORY_LIMIT as isize);
        let read = conn.lrange::<_, Vec<String>>(chat_id, window, -1);
        let mut entries = ctx.run(read).await.ok_or(StoreError::Cancelled)??;
        entries.retain(|e| !e.is_empty());
        entries.reverse();
        Ok(entries)
    }
}
