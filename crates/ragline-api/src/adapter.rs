//! Wire types and conversions between job records and API responses

use chrono::{DateTime, Utc};
use ragline_jobs::{Job, JobPayload};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for job submission endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitJobResponse {
    #[schema(example = "0b9f1a2c-8f2e-4d7e-9f9b-0f0a2e4d7e9f")]
    pub id: String,
    #[schema(example = "status/0b9f1a2c-8f2e-4d7e-9f9b-0f0a2e4d7e9f")]
    pub status_url: String,
}

/// Full job view returned by the status endpoint and error paths
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub id: String,
    pub chat_id: String,
    pub result: JobResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobOutgoingError>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    #[schema(example = "COMPLETE")]
    pub status: String,
    #[serde(rename = "rag_response", skip_serializing_if = "Option::is_none")]
    pub rag_response: Option<RagResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RagResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobOutgoingError {
    #[schema(example = 400)]
    pub code: u16,
    #[schema(example = "Job not found")]
    pub message: String,
    #[serde(rename = "can_retry")]
    pub can_retry: bool,
}

pub fn to_init_response(id: &str) -> InitJobResponse {
    InitJobResponse {
        id: id.to_owned(),
        status_url: format!("status/{id}"),
    }
}

pub fn to_api_response(job: &Job) -> JobResponse {
    let rag_response = match &job.payload {
        JobPayload::Query(query) => {
            // Only surface a RAG block once there is something to show.
            if query.answer.is_none() && query.sources.is_empty() {
                None
            } else {
                Some(RagResponse {
                    question: query.question.clone(),
                    answer: query.answer.clone().unwrap_or_default(),
                    sources: query.sources.clone(),
                })
            }
        }
        JobPayload::Ingest(_) => None,
    };

    JobResponse {
        id: job.id.clone(),
        chat_id: job.chat_id.clone().unwrap_or_default(),
        result: JobResult {
            status: job.status.to_string(),
            rag_response,
        },
        error: job.error.as_ref().map(|e| JobOutgoingError {
            code: e.code,
            message: e.message.clone(),
            can_retry: e.retryable,
        }),
        start_time: job.created_at,
        end_time: job.ended_at,
    }
}

/// Error body shared by every rejected request
pub fn error_response(id: &str, message: &str, code: u16) -> JobResponse {
    JobResponse {
        id: id.to_owned(),
        chat_id: String::new(),
        result: JobResult {
            status: "Error".to_owned(),
            rag_response: None,
        },
        error: Some(JobOutgoingError {
            code,
            message: message.to_owned(),
            can_retry: false,
        }),
        start_time: DateTime::<Utc>::MIN_UTC,
        end_time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{to_api_response, to_init_response};
    use ragline_common::TraceId;
    use ragline_jobs::Job;

    #[test]
    fn init_response_points_at_the_status_route() {
        let response = to_init_response("abc");
        assert_eq!(response.status_url, "status/abc");
    }

    #[test]
    fn fresh_query_job_has_no_rag_block() {
        let job = Job::new_query(TraceId::new(), "chat-1".into(), "q".into());
        let response = to_api_response(&job);
        assert_eq!(response.result.status, "QUEUED");
        assert!(response.result.rag_response.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn answered_job_exposes_question_answer_and_sources() {
        let mut job = Job::new_query(TraceId::new(), "chat-1".into(), "q".into());
        if let Some(query) = job.query_mut() {
            query.answer = Some("a".into());
            query.sources = vec!["page_num:1".into()];
        }
        let rag = to_api_response(&job).result.rag_response.expect("rag block");
        assert_eq!(rag.answer, "a");
        assert_eq!(rag.sources.len(), 1);
    }
}
