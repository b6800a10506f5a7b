//! Route assembly
//!
//! Protected routes (`/chat`, `/status/{id}`, `/ingest`) run behind the
//! full middleware stack; `/metrics` and the Swagger UI are mounted bare,
//! the way the exposition endpoint is expected to be scraped.

pub mod chat;
pub mod ingest;
pub mod status;

use crate::middleware;
use crate::state::AppState;
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::get;
use tower_http::timeout::{RequestBodyTimeoutLayer, TimeoutLayer};

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(chat::routes())
        .merge(status::routes())
        .merge(ingest::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::middleware::from_fn(middleware::inject_trace))
        .layer(axum::middleware::from_fn(middleware::track_http_metrics))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(TimeoutLayer::new(state.config.server.write_timeout))
        .layer(RequestBodyTimeoutLayer::new(state.config.server.read_timeout));

    Router::new()
        .merge(protected)
        .route("/metrics", get(metrics_handler))
        .merge(crate::openapi::swagger_ui())
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
