//! Job entity, persistence contracts, and the admission queue
//!
//! The job record is the unit of asynchronous work: built by the HTTP
//! adapter, handed off through a bounded channel, executed by a worker, and
//! persisted at every state transition. Stores are pluggable behind the
//! [`JobStore`] and [`MessageStore`] traits with Redis implementations and
//! in-memory fallbacks.

pub mod error;
pub mod model;
pub mod service;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use model::{IngestPayload, Job, JobError, JobKind, JobPayload, JobStatus, JobStep, QueryPayload};
pub use service::JobService;
pub use store::{
    InMemoryJobStore, InMemoryMessageStore, JobStore, MessageStore, RedisJobStore,
    RedisMessageStore,
};
