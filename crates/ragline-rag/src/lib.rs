//! The RAG execution core: query pipeline and worker pool
//!
//! [`RagService`] is the only surface the worker sees; it hides the
//! embedder, vector store, and LLM behind one contract so the pool stays
//! decoupled from provider specifics. [`WorkerPool`] owns the dispatcher,
//! the workers, and their coordinated shutdown.

pub mod service;
pub mod worker;

pub use service::{Rag, RagService};
pub use worker::WorkerPool;
