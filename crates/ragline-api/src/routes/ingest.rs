//! POST /ingest - upload a document for ingestion
//!
//! The upload is spooled to the temporary directory under a timestamped
//! name before the job is admitted; the ingest pipeline removes the spool
//! file once the content is indexed.

use crate::adapter::{error_response, to_init_response};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use ragline_common::TraceId;
use ragline_jobs::Job;
use std::path::PathBuf;
use tracing::{error, warn};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ingest", post(ingest_handler))
}

/// Receives `document_name` plus the `document` file via
/// multipart/form-data and queues an ingestion job.
#[utoipa::path(
    post,
    path = "/ingest",
    responses(
        (status = 202, description = "Ingestion job admitted", body = crate::adapter::InitJobResponse),
        (status = 400, description = "Missing fields or oversized upload", body = crate::adapter::JobResponse),
        (status = 500, description = "Spool storage failure", body = crate::adapter::JobResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn ingest_handler(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    mut multipart: Multipart,
) -> Response {
    let mut doc_name: Option<String> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(trace_id = %trace_id, error = %e, "bad multipart upload");
                return bad_request("", "File too large or bad request");
            }
        };
        match field.name() {
            Some("document_name") => match field.text().await {
                Ok(text) => doc_name = Some(text),
                Err(e) => {
                    warn!(trace_id = %trace_id, error = %e, "unreadable document_name field");
                    return bad_request("", "File too large or bad request");
                }
            },
            Some("document") => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes.to_vec())),
                    Err(e) => {
                        warn!(trace_id = %trace_id, error = %e, "unreadable document field");
                        return bad_request("", "File too large or bad request");
                    }
                }
            }
            _ => {}
        }
    }

    let Some(doc_name) = doc_name.filter(|n| !n.is_empty()) else {
        return bad_request("", "document_name is required");
    };
    let Some((file_name, bytes)) = upload else {
        return bad_request(&doc_name, "Could not retrieve file");
    };

    let spool_path = match spool_upload(&state, &file_name, &bytes).await {
        Ok(path) => path,
        Err(e) => {
            error!(trace_id = %trace_id, error = %e, "failed to spool upload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_response(&doc_name, "Storage error", 500)),
            )
                .into_response();
        }
    };

    let job = Job::new_ingest(trace_id, doc_name, spool_path);
    let job_id = job.id.clone();
    if let Err(e) = state.jobs.admit(job).await {
        error!(job_id, error = %e, "failed to admit ingest job");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(&job_id, "Internal Server Error", 500)),
        )
            .into_response();
    }

    (StatusCode::ACCEPTED, Json(to_init_response(&job_id))).into_response()
}

async fn spool_upload(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
) -> std::io::Result<PathBuf> {
    let dir = PathBuf::from(&state.config.server.upload_spool_dir);
    tokio::fs::create_dir_all(&dir).await?;
    let stamped = format!(
        "{}-{}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        file_name
    );
    let path = dir.join(stamped);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

fn bad_request(id: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(error_response(id, message, 400)),
    )
        .into_response()
}
