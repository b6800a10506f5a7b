//! LLM generation for the query pipeline
//!
//! Provides the [`LlmProvider`] contract and the Gemini REST implementation.
//! The provider composes the final prompt from the retrieved context lines,
//! the recent chat history, and the user question under a fixed system
//! instruction.

pub mod error;
pub mod gemini;
pub mod mock;
pub mod traits;

pub use error::{LlmError, LlmResult};
pub use gemini::GeminiProvider;
pub use traits::LlmProvider;
