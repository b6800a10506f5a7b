//! Mock LLM provider for tests across the workspace

use crate::error::{LlmError, LlmResult};
use crate::traits::LlmProvider;
use async_trait::async_trait;
use ragline_common::RequestContext;

pub struct MockLlm {
    answer: String,
    fail: bool,
}

impl MockLlm {
    pub fn answering(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(
        &self,
        _ctx: &RequestContext,
        _question: &str,
        _context_lines: &[String],
        _history: &[String],
    ) -> LlmResult<String> {
        if self.fail {
            return Err(LlmError::Provider("mock provider down".into()));
        }
        Ok(self.answer.clone())
    }
}
