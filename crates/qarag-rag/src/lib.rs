//! Indexing, retrieval and prompt assembly for QARAG
//!
//! This crate provides the search-side pipeline: a bounded-retry connection
//! manager, the corpus indexer, the ranked retrieval engine, context and prompt
//! assembly, and two search backends (Elasticsearch over HTTP and an
//! in-process Tantivy index).

mod connection;
mod elasticsearch;
mod indexer;
mod local;
mod prompt;
mod retrieval;

#[cfg(test)]
mod tests;

pub use connection::ConnectionManager;
pub use elasticsearch::{parse_search_response, ElasticsearchBackend, ElasticsearchConnector};
pub use indexer::CorpusIndexer;
pub use local::{LocalConnector, LocalSearchBackend};
pub use prompt::{ContextBuilder, PromptAugmenter, DEFAULT_TEMPLATE};
pub use retrieval::RetrievalEngine;

// Re-export core types for convenience
pub use qarag_core::{
    Connector, Document, Error, IndexSchema, IndexingReport, MultiMatchQuery, Result,
    RetryPolicy, SearchBackend, SearchResult,
};
