//! Error types for the QARAG pipeline

use std::fmt;

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong when the generation backend could not produce an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationFailure {
    RateLimited,
    Authentication,
    MalformedRequest,
    Network,
    Backend,
    EmptyResponse,
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GenerationFailure::RateLimited => "rate limited",
            GenerationFailure::Authentication => "authentication",
            GenerationFailure::MalformedRequest => "malformed request",
            GenerationFailure::Network => "network",
            GenerationFailure::Backend => "backend",
            GenerationFailure::EmptyResponse => "empty response",
        };
        f.write_str(label)
    }
}

/// Core error types for the QARAG system
#[derive(Error, Debug)]
pub enum Error {
    /// The search backend stayed unreachable for every attempt of one connect request.
    #[error("Connection error after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },

    /// A single document could not be written; the rest of the batch continues.
    #[error("Indexing error for document '{id}': {message}")]
    Indexing { id: String, message: String },

    #[error("Search backend error: {0}")]
    SearchBackend(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error ({cause}): {message}")]
    Generation {
        cause: GenerationFailure,
        message: String,
    },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    pub fn generation(cause: GenerationFailure, message: impl Into<String>) -> Self {
        Error::Generation {
            cause,
            message: message.into(),
        }
    }

    pub fn indexing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Indexing {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Whether this error ends the current conversation turn (as opposed to an operator error).
    pub fn is_turn_level(&self) -> bool {
        matches!(
            self,
            Error::Retrieval(_) | Error::Generation { .. } | Error::Timeout(_)
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
