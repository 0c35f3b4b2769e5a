//! Ranked multi-field retrieval

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use qarag_core::{Document, Error, MultiMatchQuery, Result, SearchBackend, SearchResult};

/// Runs the weighted best-fields query against an index
pub struct RetrievalEngine {
    backend: Arc<dyn SearchBackend>,
    timeout: Duration,
}

impl RetrievalEngine {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Top `max_results` documents for `query`, most relevant first
    pub async fn retrieve(
        &self,
        query: &str,
        index_name: &str,
        max_results: usize,
    ) -> Result<Vec<Document>> {
        Ok(self
            .retrieve_scored(query, index_name, max_results)
            .await?
            .into_documents())
    }

    /// Like [`retrieve`](Self::retrieve) but keeps the scores.
    ///
    /// Read-only. A zero `max_results`, a blank query or a missing index is
    /// an `Error::Retrieval`; a slow backend is an `Error::Timeout`.
    pub async fn retrieve_scored(
        &self,
        query: &str,
        index_name: &str,
        max_results: usize,
    ) -> Result<SearchResult> {
        if max_results == 0 {
            return Err(Error::Retrieval(
                "max_results must be greater than zero".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(Error::Retrieval("query is empty".to_string()));
        }

        let search = MultiMatchQuery::qa(query, max_results);
        let mut result = timeout(self.timeout, self.backend.search(index_name, &search))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "search on '{}' took longer than {:?}",
                    index_name, self.timeout
                ))
            })??;

        result.hits.truncate(max_results);
        debug!(index = index_name, hits = result.hits.len(), "retrieved documents");
        Ok(result)
    }
}
