//! GET /status/{id} - poll a job

use crate::adapter::{error_response, to_api_response};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use ragline_common::{RequestContext, TraceId};
use tracing::{debug, error};

pub fn routes() -> Router<AppState> {
    Router::new().route("/status/{id}", get(status_handler))
}

/// Current state of a job by id. Store errors read as not-found to the
/// client; the distinction stays in the logs.
#[utoipa::path(
    get,
    path = "/status/{id}",
    params(("id" = String, Path, description = "Job id returned at submission")),
    responses(
        (status = 200, description = "Current job state", body = crate::adapter::JobResponse),
        (status = 404, description = "Job not found", body = crate::adapter::JobResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn status_handler(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    Path(id): Path<String>,
) -> Response {
    debug!(trace_id = %trace_id, job_id = %id, "status lookup");
    if id.is_empty() {
        return not_found(&id);
    }

    let ctx = RequestContext::detached(trace_id);
    match state.jobs.job_store().get_job(&ctx, &id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(to_api_response(&job))).into_response(),
        Ok(None) => not_found(&id),
        Err(e) => {
            error!(job_id = %id, error = %e, "job store lookup failed");
            not_found(&id)
        }
    }
}

fn not_found(id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(error_response(id, "Job not found", 404)),
    )
        .into_response()
}
