//! Search backend trait and query types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::document::{ANSWER_FIELD, QUESTION_FIELD, TITLE_FIELD};
use crate::{Document, IndexSchema, Result};

/// A field and the weight its matches are multiplied by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBoost {
    pub field: String,
    pub boost: f32,
}

impl FieldBoost {
    pub fn new(field: impl Into<String>, boost: f32) -> Self {
        Self {
            field: field.into(),
            boost,
        }
    }

    /// `field^boost`, or just `field` when the boost is 1
    pub fn to_query_field(&self) -> String {
        if (self.boost - 1.0).abs() < f32::EPSILON {
            self.field.clone()
        } else {
            format!("{}^{}", self.field, self.boost)
        }
    }
}

/// How per-field scores combine into the document score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Score is the strongest single-field match
    BestFields,
}

/// A ranked multi-field full-text query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiMatchQuery {
    pub query: String,
    pub fields: Vec<FieldBoost>,
    pub match_type: MatchType,
    pub size: usize,
}

impl MultiMatchQuery {
    /// Default Q&A query: `question` weighted 3x over `answer` and `document_title`.
    pub fn qa(query: impl Into<String>, size: usize) -> Self {
        Self {
            query: query.into(),
            fields: vec![
                FieldBoost::new(QUESTION_FIELD, 3.0),
                FieldBoost::new(ANSWER_FIELD, 1.0),
                FieldBoost::new(TITLE_FIELD, 1.0),
            ],
            match_type: MatchType::BestFields,
            size,
        }
    }

    /// Elasticsearch `_search` body
    pub fn to_search_body(&self) -> Value {
        let fields: Vec<String> = self.fields.iter().map(FieldBoost::to_query_field).collect();
        let match_type = match self.match_type {
            MatchType::BestFields => "best_fields",
        };

        json!({
            "size": self.size,
            "query": {
                "bool": {
                    "must": {
                        "multi_match": {
                            "query": self.query,
                            "fields": fields,
                            "type": match_type,
                        }
                    }
                }
            }
        })
    }
}

/// A scored match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Hits ordered by descending score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
}

impl SearchResult {
    pub fn documents(&self) -> Vec<Document> {
        self.hits.iter().map(|h| h.document.clone()).collect()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.hits.into_iter().map(|h| h.document).collect()
    }
}

/// Trait for search backends (e.g., Elasticsearch, an in-process index)
///
/// Implementations must be safe for concurrent readers; writes rely on the
/// backend's per-document atomicity.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Liveness probe; `Ok(false)` means reachable but not answering
    async fn ping(&self) -> Result<bool>;

    /// Check whether an index exists
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create an index with the given schema
    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()>;

    /// Insert or overwrite a document keyed by its id
    async fn upsert(&self, index: &str, document: &Document) -> Result<()>;

    /// Ranked multi-field search; fails with `Error::Retrieval` for a missing index
    async fn search(&self, index: &str, query: &MultiMatchQuery) -> Result<SearchResult>;
}

/// Opens backend handles for the connection manager
#[async_trait]
pub trait Connector: Send + Sync {
    type Backend: SearchBackend;

    /// Open a handle; liveness is verified separately by the caller
    async fn open(&self) -> Result<Self::Backend>;

    /// Where this connector points, for logs
    fn describe(&self) -> String;
}
