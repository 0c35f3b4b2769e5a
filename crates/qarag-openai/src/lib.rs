//! OpenAI integration for QARAG
//!
//! This crate provides the OpenAI implementation of the LLMProvider trait.

mod client;
mod config;

#[cfg(test)]
mod tests;

pub use client::{failure_for_status, OpenAIClient};
pub use config::{OpenAIConfig, DEFAULT_API_URL};

// Re-export core types for convenience
pub use qarag_core::{Error, GenerationFailure, GenerationResult, LLMProvider, Result};
