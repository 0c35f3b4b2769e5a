//! OpenAI chat-completions client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::time::timeout;
use tracing::debug;

use qarag_core::{Error, GenerationFailure, GenerationResult, LLMProvider, Result};

use crate::config::OpenAIConfig;

/// OpenAI (or compatible) generation client
pub struct OpenAIClient {
    config: OpenAIConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl OpenAIClient {
    /// Create a new OpenAI client from configuration
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::generation(GenerationFailure::Network, e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new OpenAI client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAIConfig::from_env()?)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'))
    }

    async fn perform_generation(&self, prompt: &str, model_id: &str) -> Result<GenerationResult> {
        let request = ChatRequest {
            model: model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(GenerationFailure::Network, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::generation(GenerationFailure::Network, e.to_string()))?;

        if !status.is_success() {
            return Err(Error::generation(
                failure_for_status(status),
                format!("OpenAI API request failed with status {}: {}", status, body),
            ));
        }

        let (text, tokens_used) = parse_completion(&body)?;
        Ok(GenerationResult {
            text,
            model_id: model_id.to_string(),
            tokens_used,
        })
    }
}

/// Classify a non-success HTTP status
pub fn failure_for_status(status: StatusCode) -> GenerationFailure {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationFailure::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationFailure::Authentication,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            GenerationFailure::MalformedRequest
        }
        _ => GenerationFailure::Backend,
    }
}

/// Extract the first choice's text (and token usage) from a completion body
fn parse_completion(body: &str) -> Result<(String, Option<u32>)> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        Error::generation(
            GenerationFailure::Backend,
            format!("unexpected completion response: {}", e),
        )
    })?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            Error::generation(
                GenerationFailure::EmptyResponse,
                "completion contained no text".to_string(),
            )
        })?;

    Ok((text, response.usage.map(|u| u.total_tokens)))
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<GenerationResult> {
        let started = Instant::now();
        let result = match timeout(self.config.timeout, self.perform_generation(prompt, model_id)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "generation request timed out after {:?}",
                    self.config.timeout
                )))
            }
        };

        debug!(
            model = model_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            tokens = result.tokens_used,
            "generation completed"
        );
        Ok(result)
    }

    fn default_model(&self) -> &str {
        &self.config.model_id
    }
}
