//! POST /chat - submit a query job

use crate::adapter::{error_response, to_init_response};
use crate::state::AppState;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use ragline_common::{RequestContext, TraceId};
use ragline_jobs::Job;
use serde::Deserialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user question; required and non-empty
    pub message: String,
    /// Existing chat to continue; omit to start a new one
    #[serde(rename = "chatID", default)]
    pub chat_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/chat", post(chat_handler))
}

/// Accepts a message, admits a background query job, and returns the job id
/// to poll.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 202, description = "Job admitted", body = crate::adapter::InitJobResponse),
        (status = 400, description = "Invalid request data or chat id", body = crate::adapter::JobResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn chat_handler(
    State(state): State<AppState>,
    Extension(trace_id): Extension<TraceId>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = body else {
        warn!(trace_id = %trace_id, "malformed chat request body");
        return bad_request("", "Bad Request");
    };
    if request.message.is_empty() {
        warn!(trace_id = %trace_id, "chat request without a message");
        return bad_request(&request.chat_id, "Bad Request");
    }

    let ctx = RequestContext::detached(trace_id.clone());
    let is_new_chat = request.chat_id.is_empty();
    let chat_id = if is_new_chat {
        let minted = Uuid::new_v4().to_string();
        debug!(trace_id = %trace_id, chat_id = %minted, "starting new chat");
        minted
    } else {
        // Continuing a conversation requires a chat the store knows about.
        if !state
            .jobs
            .message_store()
            .validate_chat_id(&ctx, &request.chat_id)
            .await
        {
            warn!(trace_id = %trace_id, chat_id = %request.chat_id, "unknown chat id");
            return bad_request(&request.chat_id, "Bad Request");
        }
        request.chat_id.clone()
    };

    let job = Job::new_query(trace_id, chat_id.clone(), request.message);
    let job_id = job.id.clone();
    if let Err(e) = state.jobs.admit(job).await {
        error!(job_id, error = %e, "failed to admit chat job");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_response(&job_id, "Internal Server Error", 500)),
        )
            .into_response();
    }

    if is_new_chat {
        if let Err(e) = state.jobs.message_store().init_new_chat(&ctx, &chat_id).await {
            error!(chat_id, error = %e, "failed to initialize chat");
        }
    }

    (StatusCode::ACCEPTED, Json(to_init_response(&job_id))).into_response()
}

fn bad_request(id: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(error_response(id, message, 400)),
    )
        .into_response()
}
