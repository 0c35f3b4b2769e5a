//! Core traits and types for QARAG
//!
//! This crate defines the types shared across the question-answering pipeline:
//! corpus documents and their index schema, the search-backend and LLM-provider
//! capability traits, retry policy, conversation turns and configuration.

pub mod config;
pub mod document;
pub mod error;
pub mod llm;
pub mod search_backend;
pub mod types;


pub use config::{SearchBackendKind, SearchConfig, Settings};
pub use document::{Document, FieldDefinition, FieldType, IndexSchema};
pub use error::{Error, GenerationFailure, Result};
pub use llm::{GenerationResult, LLMProvider};
pub use search_backend::{
    Connector, FieldBoost, MatchType, MultiMatchQuery, SearchBackend, SearchHit, SearchResult,
};
pub use types::*;
