//! LLM provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Result of a text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers (e.g., OpenAI or any compatible endpoint)
///
/// One prompt per call, no streaming, no retries and no carried conversation.
/// Failures are `Error::Generation` or `Error::Timeout`; retrying is up to the caller.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single prompt with the given model
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<GenerationResult>;

    /// The model used when the caller has no preference
    fn default_model(&self) -> &str;
}
