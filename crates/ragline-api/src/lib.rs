//! HTTP surface for the asynchronous RAG job service
//!
//! Routes build jobs, admit them to the bounded queue, and answer with a
//! job id; clients poll the status endpoint. Middleware handles trace-id
//! propagation, bearer auth, optional per-IP rate limiting, and HTTP
//! metrics. Prometheus exposition and Swagger live next to the routes.

pub mod adapter;
pub mod bootstrap;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use state::AppState;
