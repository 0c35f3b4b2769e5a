//! Corpus indexing: index creation and idempotent upserts

use std::sync::Arc;
use tracing::{info, warn};

use qarag_core::{
    Document, IndexSchema, IndexingFailure, IndexingReport, Result, SearchBackend,
};

/// Populates a search index from corpus documents
pub struct CorpusIndexer {
    backend: Arc<dyn SearchBackend>,
}

impl CorpusIndexer {
    /// Create a new corpus indexer
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Create the index with `schema` if it does not exist; an existing index is left as is.
    pub async fn ensure_index(&self, name: &str, schema: &IndexSchema) -> Result<()> {
        if self.backend.index_exists(name).await? {
            info!(index = name, "index already exists");
            return Ok(());
        }

        match self.backend.create_index(name, schema).await {
            Ok(()) => {
                info!(index = name, backend = self.backend.name(), "index created");
                Ok(())
            }
            // Another writer may have created it between the check and the create.
            Err(e) => {
                if self.backend.index_exists(name).await.unwrap_or(false) {
                    info!(index = name, "index created concurrently");
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Write every document keyed by its id.
    ///
    /// A failed document is recorded in the report and the batch continues;
    /// re-running the same batch converges to the same indexed set.
    pub async fn upsert(&self, name: &str, documents: &[Document]) -> Result<IndexingReport> {
        let mut report = IndexingReport::default();

        for document in documents {
            match self.backend.upsert(name, document).await {
                Ok(()) => report.documents_indexed += 1,
                Err(e) => {
                    warn!(index = name, id = %document.id, error = %e, "failed to index document");
                    report.documents_failed += 1;
                    report.failures.push(IndexingFailure {
                        id: document.id.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        info!(
            index = name,
            indexed = report.documents_indexed,
            failed = report.documents_failed,
            "upsert batch finished"
        );
        Ok(report)
    }
}
