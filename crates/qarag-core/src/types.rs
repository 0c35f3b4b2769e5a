//! Common types used across the QARAG system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Bounded retry for establishing a backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Add up to 10% random delay on top of `interval`
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval: Duration::from_secs(10),
            jitter: false,
        }
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One entry in a conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Outcome of upserting a batch of documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexingReport {
    pub documents_indexed: usize,
    pub documents_failed: usize,
    pub failures: Vec<IndexingFailure>,
}

impl IndexingReport {
    pub fn is_complete(&self) -> bool {
        self.documents_failed == 0
    }
}

/// A document that could not be written, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexingFailure {
    pub id: String,
    pub cause: String,
}
