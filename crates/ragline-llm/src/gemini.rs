//! Gemini REST generation client

use crate::error::{LlmError, LlmResult};
use crate::traits::LlmProvider;
use async_trait::async_trait;
use ragline_common::RequestContext;
use ragline_config::{LlmConfig, RagConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct GeminiProvider {
    http: reqwest::Client,
    config: LlmConfig,
    system_instruction: String,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(config: LlmConfig, rag: &RagConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            system_instruction: rag.system_instruction.clone(),
        }
    }
}

/// Compose the user prompt: retrieved context lines, preceded by the prior
/// exchanges when the chat has any. History entries are serialized
/// question/answer/sources payloads, most-recent first.
fn build_prompt(question: &str, context_lines: &[String], history: &[String]) -> String {
    let mut context_text = String::from("This is the context:\n");
    if !history.is_empty() {
        context_text.push_str(
            "This is the message history: Question stands for the user question, \
             answer stands for the answer you gave, sources are the sources for that answer\n",
        );
        context_text.push_str(&history.join("\n"));
        context_text.push('\n');
    }
    context_text.push_str(&context_lines.join("\n"));
    format!("Context:\n{context_text}\n\nUser Question: {question}")
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(
        &self,
        ctx: &RequestContext,
        question: &str,
        context_lines: &[String],
        history: &[String],
    ) -> LlmResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let body = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(question, context_lines, history),
                }],
            }],
        };

        let call = async {
            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(LlmError::Provider(format!("{status}: {detail}")));
            }
            response
                .json::<GenerateContentResponse>()
                .await
                .map_err(LlmError::from)
        };

        let response = ctx.run(call).await.ok_or(LlmError::Cancelled)??;
        let answer: String = response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        debug!(trace_id = %ctx.trace_id(), chars = answer.len(), "llm generation complete");
        Ok(answer)
    }
}
