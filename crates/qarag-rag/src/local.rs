//! In-process full-text search backend (BM25 via Tantivy)

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::{
    collector::TopDocs,
    query::{BoostQuery, DisjunctionMaxQuery, Query, QueryParser, TermQuery},
    schema::{Field, IndexRecordOption, OwnedValue, Schema, STORED, STRING, TEXT},
    Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term,
};
use tracing::{debug, info, warn};

use qarag_core::document::{ANSWER_FIELD, ID_FIELD, QUESTION_FIELD, TITLE_FIELD};
use qarag_core::{
    Connector, Document, Error, FieldType, IndexSchema, MultiMatchQuery, Result, SearchBackend,
    SearchHit, SearchResult,
};

const WRITER_MEMORY_BYTES: usize = 20_000_000;

struct QaFields {
    id: Field,
    title: Field,
    question: Field,
    answer: Field,
}

impl QaFields {
    fn resolve(schema: &Schema) -> Result<Self> {
        let get = |name: &str| {
            schema.get_field(name).map_err(|_| {
                Error::SearchBackend(format!("index schema has no '{}' field", name))
            })
        };

        Ok(Self {
            id: get(ID_FIELD)?,
            title: get(TITLE_FIELD)?,
            question: get(QUESTION_FIELD)?,
            answer: get(ANSWER_FIELD)?,
        })
    }
}

/// An open index. The writer is taken on first write only, since a directory
/// admits a single writer and readers in other processes must still open it.
struct LocalIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<Option<IndexWriter>>,
    schema: Schema,
    fields: QaFields,
}

impl LocalIndex {
    fn from_index(index: Index) -> Result<Self> {
        let schema = index.schema();
        let fields = QaFields::resolve(&schema)?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(backend_error)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(None),
            schema,
            fields,
        })
    }

    /// Write `doc` in place of any document with the same id and commit
    fn replace(&self, id: &str, doc: TantivyDocument) -> tantivy::Result<()> {
        let mut slot = self.writer.lock();
        let mut writer: IndexWriter = match slot.take() {
            Some(writer) => writer,
            None => self.index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?,
        };

        writer.delete_term(Term::from_field_text(self.fields.id, id));
        let written = writer.add_document(doc).and_then(|_| writer.commit());
        if written.is_err() {
            if let Err(rollback) = writer.rollback() {
                warn!(id, error = %rollback, "rollback after failed upsert failed");
            }
        }
        *slot = Some(writer);
        written.map(|_| ())
    }

    /// Pick up commits made since the last reload, including other processes'
    fn refresh(&self) -> Result<()> {
        self.reader
            .reload()
            .map_err(|e| Error::Retrieval(format!("failed to reload index: {}", e)))
    }

    fn to_document(&self, doc: &TantivyDocument) -> Document {
        let text = |field: Field| match doc.get_first(field) {
            Some(OwnedValue::Str(s)) => s.to_string(),
            _ => String::new(),
        };

        Document {
            id: text(self.fields.id),
            title: text(self.fields.title),
            question: text(self.fields.question),
            answer: text(self.fields.answer),
        }
    }
}

fn backend_error(err: tantivy::TantivyError) -> Error {
    Error::SearchBackend(err.to_string())
}

fn build_schema(schema: &IndexSchema) -> Schema {
    let mut builder = Schema::builder();
    for field in &schema.fields {
        match field.field_type {
            FieldType::Keyword => builder.add_text_field(&field.name, STRING | STORED),
            FieldType::Text => builder.add_text_field(&field.name, TEXT | STORED),
        };
    }
    builder.build()
}

/// Tantivy-backed search backend holding any number of named indexes,
/// in RAM or one directory per index under `root`.
pub struct LocalSearchBackend {
    root: Option<PathBuf>,
    indexes: RwLock<HashMap<String, Arc<LocalIndex>>>,
}

impl LocalSearchBackend {
    /// Backend whose indexes live only in memory
    pub fn in_memory() -> Self {
        Self {
            root: None,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Backend persisting each index under `root/<index name>`
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            indexes: RwLock::new(HashMap::new()),
        }
    }

    fn index_path(&self, name: &str) -> Result<Option<PathBuf>> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::InvalidInput(format!("invalid index name '{}'", name)));
        }
        Ok(self.root.as_ref().map(|root| root.join(name)))
    }

    /// Find an open index, opening it from disk if it was created earlier
    fn lookup(&self, name: &str) -> Result<Option<Arc<LocalIndex>>> {
        if let Some(index) = self.indexes.read().get(name) {
            return Ok(Some(index.clone()));
        }

        let Some(path) = self.index_path(name)? else {
            return Ok(None);
        };
        if !path.join("meta.json").exists() {
            return Ok(None);
        }

        let mut indexes = self.indexes.write();
        if let Some(index) = indexes.get(name) {
            return Ok(Some(index.clone()));
        }
        let index = Index::open_in_dir(&path).map_err(backend_error)?;
        let local = Arc::new(LocalIndex::from_index(index)?);
        indexes.insert(name.to_string(), local.clone());
        debug!(index = name, path = %path.display(), "opened local index");
        Ok(Some(local))
    }

    fn require(&self, name: &str) -> Result<Arc<LocalIndex>> {
        self.lookup(name)?
            .ok_or_else(|| Error::Retrieval(format!("index '{}' does not exist", name)))
    }

    /// Number of live documents in an index
    pub fn document_count(&self, name: &str) -> Result<u64> {
        let local = self.require(name)?;
        local.refresh()?;
        Ok(local.reader.searcher().num_docs())
    }

    /// Fetch a document by its id
    pub fn get(&self, name: &str, id: &str) -> Result<Option<Document>> {
        let local = self.require(name)?;
        local.refresh()?;
        let searcher = local.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(local.fields.id, id),
            IndexRecordOption::Basic,
        );

        let top = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(backend_error)?;

        match top.first() {
            Some((_, address)) => {
                let doc: TantivyDocument = searcher.doc(*address).map_err(backend_error)?;
                Ok(Some(local.to_document(&doc)))
            }
            None => Ok(None),
        }
    }
}

impl Default for LocalSearchBackend {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl SearchBackend for LocalSearchBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn ping(&self) -> Result<bool> {
        Ok(true)
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.lookup(index)?.is_some())
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let path = self.index_path(index)?;
        let mut indexes = self.indexes.write();
        if indexes.contains_key(index) {
            return Err(Error::SearchBackend(format!("index '{}' already exists", index)));
        }

        let tantivy_schema = build_schema(schema);
        let created = match path {
            Some(ref path) => {
                std::fs::create_dir_all(path)?;
                Index::create_in_dir(path, tantivy_schema)
            }
            None => Ok(Index::create_in_ram(tantivy_schema)),
        }
        .map_err(backend_error)?;

        indexes.insert(index.to_string(), Arc::new(LocalIndex::from_index(created)?));
        info!(index, persisted = path.is_some(), "created local index");
        Ok(())
    }

    async fn upsert(&self, index: &str, document: &Document) -> Result<()> {
        let local = self
            .lookup(index)
            .map_err(|e| Error::indexing(&document.id, e.to_string()))?
            .ok_or_else(|| {
                Error::indexing(&document.id, format!("index '{}' does not exist", index))
            })?;

        let fields = &local.fields;
        let mut doc = TantivyDocument::default();
        doc.add_text(fields.id, &document.id);
        doc.add_text(fields.title, &document.title);
        doc.add_text(fields.question, &document.question);
        doc.add_text(fields.answer, &document.answer);

        local
            .replace(&document.id, doc)
            .map_err(|e| Error::indexing(&document.id, e.to_string()))?;

        local
            .reader
            .reload()
            .map_err(|e| Error::indexing(&document.id, e.to_string()))
    }

    async fn search(&self, index: &str, query: &MultiMatchQuery) -> Result<SearchResult> {
        if query.size == 0 {
            return Err(Error::Retrieval("result size must be greater than zero".to_string()));
        }

        let local = self.require(index)?;
        local.refresh()?;

        // Strongest single-field match wins: dis_max over boosted per-field queries.
        let mut disjuncts: Vec<Box<dyn Query>> = Vec::with_capacity(query.fields.len());
        for field_boost in &query.fields {
            let field = local.schema.get_field(&field_boost.field).map_err(|_| {
                Error::Retrieval(format!("unknown field '{}'", field_boost.field))
            })?;
            let parser = QueryParser::for_index(&local.index, vec![field]);
            let (parsed, errors) = parser.parse_query_lenient(&query.query);
            if !errors.is_empty() {
                debug!(field = %field_boost.field, ?errors, "ignored unparsable query parts");
            }
            disjuncts.push(Box::new(BoostQuery::new(parsed, field_boost.boost)));
        }
        let combined = DisjunctionMaxQuery::new(disjuncts);

        let searcher = local.reader.searcher();
        let top = searcher
            .search(&combined, &TopDocs::with_limit(query.size))
            .map_err(|e| Error::Retrieval(e.to_string()))?;

        let mut result = SearchResult::default();
        for (score, address) in top {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::Retrieval(e.to_string()))?;
            result.hits.push(SearchHit {
                document: local.to_document(&doc),
                score,
            });
        }

        debug!(index, hits = result.hits.len(), "local search completed");
        Ok(result)
    }
}

/// Opens local backends for the connection manager
pub struct LocalConnector {
    root: Option<PathBuf>,
}

impl LocalConnector {
    pub fn new(root: Option<&Path>) -> Self {
        Self {
            root: root.map(Path::to_path_buf),
        }
    }
}

#[async_trait]
impl Connector for LocalConnector {
    type Backend = LocalSearchBackend;

    async fn open(&self) -> Result<LocalSearchBackend> {
        Ok(match self.root {
            Some(ref root) => LocalSearchBackend::in_dir(root),
            None => LocalSearchBackend::in_memory(),
        })
    }

    fn describe(&self) -> String {
        match self.root {
            Some(ref root) => format!("local:{}", root.display()),
            None => "local:memory".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "qa";

    async fn backend_with(docs: &[Document]) -> LocalSearchBackend {
        let backend = LocalSearchBackend::in_memory();
        backend.create_index(INDEX, &IndexSchema::qa_corpus()).await.unwrap();
        for doc in docs {
            backend.upsert(INDEX, doc).await.unwrap();
        }
        backend
    }

    fn ids(result: &SearchResult) -> Vec<&str> {
        result.hits.iter().map(|h| h.document.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_index_lifecycle() {
        let backend = LocalSearchBackend::in_memory();
        assert!(backend.ping().await.unwrap());
        assert!(!backend.index_exists(INDEX).await.unwrap());

        backend.create_index(INDEX, &IndexSchema::qa_corpus()).await.unwrap();
        assert!(backend.index_exists(INDEX).await.unwrap());
        assert_eq!(backend.document_count(INDEX).unwrap(), 0);

        let err = backend.create_index(INDEX, &IndexSchema::qa_corpus()).await.unwrap_err();
        assert!(matches!(err, Error::SearchBackend(_)));
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let backend = backend_with(&[]).await;
        let first = Document::new("Q1", "Paris", "What is the capital of France?", "Lyon");
        let second = Document::new("Q1", "Paris", "What is the capital of France?", "Paris");

        for _ in 0..3 {
            backend.upsert(INDEX, &first).await.unwrap();
        }
        backend.upsert(INDEX, &second).await.unwrap();

        assert_eq!(backend.document_count(INDEX).unwrap(), 1);
        assert_eq!(backend.get(INDEX, "Q1").unwrap(), Some(second));
        assert_eq!(backend.get(INDEX, "Q2").unwrap(), None);
    }

    #[tokio::test]
    async fn test_question_field_outranks_answer_field() {
        let backend = backend_with(&[
            Document::new("in-answer", "Notes", "unrelated words here", "glacier formation"),
            Document::new("in-question", "Notes", "glacier formation", "unrelated words here"),
        ])
        .await;

        let result = backend
            .search(INDEX, &MultiMatchQuery::qa("glacier", 5))
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["in-question", "in-answer"]);
        assert!(result.hits[0].score > result.hits[1].score);
    }

    #[tokio::test]
    async fn test_best_field_not_sum_of_fields() {
        // "volcano" appears in two titles and two questions, so both fields share one idf.
        let backend = backend_with(&[
            Document::new("title-and-question", "volcano", "volcano", "ash"),
            Document::new("question-only", "lava", "volcano", "ash"),
            Document::new("title-only", "volcano", "rock", "ash"),
        ])
        .await;

        let result = backend
            .search(INDEX, &MultiMatchQuery::qa("volcano", 5))
            .await
            .unwrap();
        let score = |id: &str| {
            result
                .hits
                .iter()
                .find(|h| h.document.id == id)
                .map(|h| h.score)
                .unwrap()
        };

        let diff = (score("title-and-question") - score("question-only")).abs();
        assert!(diff < 1e-3, "extra matching field changed the score by {}", diff);
        assert!(score("question-only") > score("title-only"));
        assert_eq!(result.hits[2].document.id, "title-only");
    }

    #[tokio::test]
    async fn test_result_bound_and_no_padding() {
        let docs: Vec<Document> = (0..8)
            .map(|i| Document::new(format!("Q{}", i), "Rivers", format!("river number {}", i), "water"))
            .collect();
        let backend = backend_with(&docs).await;

        for k in 1..=10 {
            let result = backend.search(INDEX, &MultiMatchQuery::qa("river", k)).await.unwrap();
            assert_eq!(result.hits.len(), k.min(8));
        }

        let result = backend.search(INDEX, &MultiMatchQuery::qa("desert", 5)).await.unwrap();
        assert!(result.hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_errors() {
        let backend = backend_with(&[]).await;

        let err = backend.search("missing", &MultiMatchQuery::qa("x", 5)).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));

        let err = backend.search(INDEX, &MultiMatchQuery::qa("x", 0)).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_upsert_into_missing_index_reports_document() {
        let backend = LocalSearchBackend::in_memory();
        let err = backend
            .upsert("missing", &Document::new("Q9", "t", "q", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Indexing { ref id, .. } if id == "Q9"));
    }

    #[tokio::test]
    async fn test_persisted_index_reopens() {
        let dir = tempfile::tempdir().unwrap();

        {
            let backend = LocalSearchBackend::in_dir(dir.path());
            backend.create_index(INDEX, &IndexSchema::qa_corpus()).await.unwrap();
            backend
                .upsert(INDEX, &Document::new("Q1", "Paris", "What is the capital of France?", "Paris"))
                .await
                .unwrap();
        }

        let reopened = LocalSearchBackend::in_dir(dir.path());
        assert!(reopened.index_exists(INDEX).await.unwrap());
        let result = reopened
            .search(INDEX, &MultiMatchQuery::qa("capital of France", 5))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["Q1"]);
    }

    #[tokio::test]
    async fn test_second_backend_on_same_directory_can_read() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalSearchBackend::in_dir(dir.path());
        writer.create_index(INDEX, &IndexSchema::qa_corpus()).await.unwrap();
        writer
            .upsert(INDEX, &Document::new("Q1", "Paris", "What is the capital of France?", "Paris"))
            .await
            .unwrap();

        let reader = LocalSearchBackend::in_dir(dir.path());
        assert!(reader.index_exists(INDEX).await.unwrap());
        let result = reader
            .search(INDEX, &MultiMatchQuery::qa("capital", 5))
            .await
            .unwrap();
        assert_eq!(ids(&result), vec!["Q1"]);

        // Later writes by the first backend become visible to the second.
        writer
            .upsert(INDEX, &Document::new("Q2", "Berlin", "What is the capital of Germany?", "Berlin"))
            .await
            .unwrap();
        let result = reader
            .search(INDEX, &MultiMatchQuery::qa("capital", 5))
            .await
            .unwrap();
        assert_eq!(result.hits.len(), 2);
        assert_eq!(reader.document_count(INDEX).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rejects_path_like_index_names() {
        let backend = LocalSearchBackend::in_memory();
        let err = backend.index_exists("../etc").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
