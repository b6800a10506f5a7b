//! The job record and its lifecycle types

use chrono::{DateTime, Utc};
use ragline_common::TraceId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Externally visible job state.
///
/// Monotonic along `Queued -> Running -> Complete | Error`; the terminal
/// states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "QUEUED")]
    Queued,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "COMPLETE")]
    Complete,
    #[serde(rename = "Error")]
    Error,
}

impl JobStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Error => "Error",
        };
        write!(f, "{label}")
    }
}

/// Fine-grained progress token, exposed for observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStep {
    Init,
    #[serde(rename = "EmbeddingAPI")]
    EmbeddingApi,
    CacheCall,
    #[serde(rename = "VectorDB")]
    VectorDb,
    #[serde(rename = "LLM")]
    Llm,
    IngestInit,
    IngestProcessing,
    Complete,
    Error,
}

/// Which pipeline a job runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Query,
    Ingest,
}

/// Variant-specific job data; the tag is persisted alongside the fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    Query(QueryPayload),
    Ingest(IngestPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPayload {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Provenance tags copied from the vector hits that fed the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPayload {
    pub doc_name: String,
    /// Spooled upload awaiting extraction; removed after a successful ingest
    pub source_path: PathBuf,
}

/// Terminal error details surfaced to the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobError {
    pub code: u16,
    pub message: String,
    #[serde(rename = "retry")]
    pub retryable: bool,
}

/// Unit of asynchronous work.
///
/// Exclusively owned by whoever currently holds it (adapter, queue, worker)
/// and shared with the store only via serialized copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub trace_id: TraceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub step: JobStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Queued query job. Chat id is always present for queries; the adapter
    /// mints one when the client did not supply it.
    pub fn new_query(trace_id: TraceId, chat_id: String, question: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trace_id,
            chat_id: Some(chat_id),
            payload: JobPayload::Query(QueryPayload {
                question,
                answer: None,
                sources: Vec::new(),
            }),
            status: JobStatus::Queued,
            step: JobStep::Init,
            error: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Queued ingest job for a spooled upload.
    pub fn new_ingest(trace_id: TraceId, doc_name: String, source_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trace_id,
            chat_id: None,
            payload: JobPayload::Ingest(IngestPayload {
                doc_name,
                source_path,
            }),
            status: JobStatus::Queued,
            step: JobStep::IngestInit,
            error: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub const fn kind(&self) -> JobKind {
        match self.payload {
            JobPayload::Query(_) => JobKind::Query,
            JobPayload::Ingest(_) => JobKind::Ingest,
        }
    }

    pub const fn query(&self) -> Option<&QueryPayload> {
        match &self.payload {
            JobPayload::Query(q) => Some(q),
            JobPayload::Ingest(_) => None,
        }
    }

    pub fn query_mut(&mut self) -> Option<&mut QueryPayload> {
        match &mut self.payload {
            JobPayload::Query(q) => Some(q),
            JobPayload::Ingest(_) => None,
        }
    }

    pub const fn ingest(&self) -> Option<&IngestPayload> {
        match &self.payload {
            JobPayload::Ingest(i) => Some(i),
            JobPayload::Query(_) => None,
        }
    }

    /// Mark the job failed with a classified error. Error is terminal.
    pub fn fail(&mut self, code: u16, message: impl Into<String>, retryable: bool) {
        self.status = JobStatus::Error;
        self.step = JobStep::Error;
        self.error = Some(JobError {
            code,
            message: message.into(),
            retryable,
        });
    }
}
