//! Common utilities shared across ragline crates
//!
//! This crate provides the trace-id type, the cancellation-aware request
//! context handed to every boundary call, and one-time environment setup.

pub mod context;
pub mod init;
pub mod trace;

pub use context::RequestContext;
pub use init::initialize_environment;
pub use trace::TraceId;
