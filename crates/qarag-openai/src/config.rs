//! OpenAI configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use qarag_core::config::DEFAULT_MODEL;
use qarag_core::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Configuration for the OpenAI generation client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub api_url: String,
    pub model_id: String,
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            Error::Configuration("OPENAI_API_KEY is not set".to_string())
        })?;

        Ok(Self {
            api_key,
            api_url: get("OPENAI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            model_id: get("QARAG_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(60),
        })
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
