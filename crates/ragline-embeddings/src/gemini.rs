//! Gemini REST embedding client
//!
//! Speaks the `generativelanguage` HTTP surface: `:embedContent` for single
//! queries, `:batchEmbedContents` for inline batches, and
//! `:asyncBatchEmbedContent` plus batch GETs for long-poll jobs. The base
//! URL is injectable so tests can point the client at a local mock server.

use crate::error::{EmbeddingError, EmbeddingResult};
use crate::traits::Embedder;
use async_trait::async_trait;
use ragline_common::RequestContext;
use ragline_config::EmbeddingConfig;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

const TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";

pub struct GeminiEmbedder {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: text.to_owned(),
            }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    content: Content,
    output_dimensionality: usize,
    task_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchItem {
    model: String,
    content: Content,
    output_dimensionality: usize,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<BatchItem>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBatchJobRequest {
    batch: BatchJobSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchJobSpec {
    display_name: String,
    input_config: BatchInputConfig,
}

#[derive(Serialize)]
struct BatchInputConfig {
    requests: BatchEmbedRequest,
}

#[derive(Deserialize)]
struct BatchJob {
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    dest: Option<BatchJobDest>,
}

#[derive(Deserialize)]
struct BatchJobDest {
    #[serde(rename = "inlinedEmbedContentResponses", default)]
    inlined: Vec<InlinedEmbedResponse>,
}

#[derive(Deserialize)]
struct InlinedEmbedResponse {
    #[serde(default)]
    response: Option<EmbedContentResponse>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl GeminiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn model_url(&self, verb: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{verb}",
            self.config.base_url, self.config.model
        )
    }

    fn batch_item(&self, text: &str) -> BatchItem {
        BatchItem {
            model: format!("models/{}", self.config.model),
            content: Content::from_text(text),
            output_dimensionality: self.config.output_dimension,
            task_type: TASK_TYPE,
        }
    }

    async fn post<Req, Resp>(&self, url: &str, body: &Req) -> EmbeddingResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited(status.to_string()));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!("{status}: {detail}")));
        }
        Ok(response.json().await?)
    }

    async fn inline_batch(
        &self,
        ctx: &RequestContext,
        texts: &[String],
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let url = self.model_url("batchEmbedContents");
        let body = BatchEmbedRequest {
            requests: texts.iter().map(|t| self.batch_item(t)).collect(),
        };

        let call = self.post::<_, BatchEmbedResponse>(&url, &body);
        let first = ctx.run(call).await.ok_or(EmbeddingError::Cancelled)?;

        let response = match first {
            Err(EmbeddingError::RateLimited(detail)) => {
                // One retry after a fixed backoff, then give up.
                warn!(trace_id = %ctx.trace_id(), detail, "rate limit hit, retrying once");
                let backoff = tokio::time::sleep(self.config.rate_limit_backoff);
                ctx.run(backoff).await.ok_or(EmbeddingError::Cancelled)?;
                let retry = self.post::<_, BatchEmbedResponse>(&url, &body);
                ctx.run(retry).await.ok_or(EmbeddingError::Cancelled)??
            }
            other => other?,
        };

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }

    async fn long_poll_batch(
        &self,
        ctx: &RequestContext,
        texts: &[String],
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        let display_name = Uuid::new_v4().to_string();
        let body = CreateBatchJobRequest {
            batch: BatchJobSpec {
                display_name: display_name.clone(),
                input_config: BatchInputConfig {
                    requests: BatchEmbedRequest {
                        requests: texts.iter().map(|t| self.batch_item(t)).collect(),
                    },
                },
            },
        };

        let create_url = self.model_url("asyncBatchEmbedContent");
        let create = self.post::<_, BatchJob>(&create_url, &body);
        let job = ctx.run(create).await.ok_or(EmbeddingError::Cancelled)??;
        debug!(trace_id = %ctx.trace_id(), batch = %display_name, job = %job.name, "created batch embedding job");

        loop {
            let wait = tokio::time::sleep(self.config.batch_poll_interval);
            ctx.run(wait).await.ok_or(EmbeddingError::Cancelled)?;

            let url = format!("{}/v1beta/{}", self.config.base_url, job.name);
            let poll = async {
                let response = self
                    .http
                    .get(&url)
                    .header("x-goog-api-key", &self.config.api_key)
                    .send()
                    .await?;
                response.json::<BatchJob>().await.map_err(EmbeddingError::from)
            };
            let polled = match ctx.run(poll).await.ok_or(EmbeddingError::Cancelled)? {
                Ok(job) => job,
                Err(e) => {
                    error!(trace_id = %ctx.trace_id(), error = %e, "batch job poll failed");
                    continue;
                }
            };

            match polled.state.as_str() {
                "JOB_STATE_SUCCEEDED" => {
                    debug!(trace_id = %ctx.trace_id(), job = %polled.name, "batch job succeeded");
                    return Ok(collect_inlined(polled));
                }
                state @ ("JOB_STATE_FAILED"
                | "JOB_STATE_CANCELLED"
                | "JOB_STATE_EXPIRED"
                | "JOB_STATE_PARTIALLY_SUCCEEDED") => {
                    // Keep waiting; the enclosing deadline decides when to
                    // stop caring about this job.
                    error!(trace_id = %ctx.trace_id(), job = %polled.name, state, "batch job ended prematurely");
                }
                _ => {}
            }
        }
    }
}

/// Flatten the inlined batch results, keeping input order. Items that failed
/// inside the batch map to an empty embedding.
fn collect_inlined(job: BatchJob) -> Vec<Vec<f32>> {
    let Some(dest) = job.dest else {
        return Vec::new();
    };
    dest.inlined
        .into_iter()
        .map(|item| {
            if item.error.is_some() {
                error!("batch item failed inside the embedding job");
                return Vec::new();
            }
            item.response.map(|r| r.embedding.values).unwrap_or_default()
        })
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, ctx: &RequestContext, text: &str) -> EmbeddingResult<Vec<f32>> {
        let url = self.model_url("embedContent");
        let body = EmbedContentRequest {
            content: Content::from_text(text),
            output_dimensionality: self.config.output_dimension,
            task_type: TASK_TYPE,
        };
        let call = self.post::<_, EmbedContentResponse>(&url, &body);
        let response = ctx.run(call).await.ok_or(EmbeddingError::Cancelled)??;
        Ok(response.embedding.values)
    }

    async fn embed_batch(
        &self,
        ctx: &RequestContext,
        texts: &[String],
        long_poll: bool,
    ) -> EmbeddingResult<Vec<Vec<f32>>> {
        if long_poll {
            self.long_poll_batch(ctx, texts).await
        } else {
            self.inline_batch(ctx, texts).await
        }
    }
}
