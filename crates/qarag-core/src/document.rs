//! Corpus documents and the index schema they are stored under

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Stored field names, shared by every backend
pub const ID_FIELD: &str = "question_id";
pub const TITLE_FIELD: &str = "document_title";
pub const QUESTION_FIELD: &str = "question";
pub const ANSWER_FIELD: &str = "answer";

/// A question/answer record from the corpus.
///
/// `id` is the only identity used for upserts; the other fields are free text.
/// On the wire the fields use the corpus names (`question_id`, `document_title`),
/// and `id`/`title` are accepted when reading records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "question_id", alias = "id")]
    pub id: String,
    #[serde(rename = "document_title", alias = "title")]
    pub title: String,
    pub question: String,
    pub answer: String,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Type of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Exact-match key, not analyzed
    Keyword,
    /// Full-text analyzed field
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
}

/// Field types and deployment settings an index is created with.
///
/// A schema is only applied when an index is created; existing indexes are never altered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub fields: Vec<FieldDefinition>,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl IndexSchema {
    /// The Q&A corpus schema: keyword id, analyzed title/question/answer.
    pub fn qa_corpus() -> Self {
        let field = |name: &str, field_type| FieldDefinition {
            name: name.to_string(),
            field_type,
        };

        Self {
            fields: vec![
                field(ANSWER_FIELD, FieldType::Text),
                field(TITLE_FIELD, FieldType::Text),
                field(QUESTION_FIELD, FieldType::Text),
                field(ID_FIELD, FieldType::Keyword),
            ],
            number_of_shards: 1,
            number_of_replicas: 0,
        }
    }

    pub fn with_shards(mut self, shards: u32) -> Self {
        self.number_of_shards = shards;
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.number_of_replicas = replicas;
        self
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
    }

    /// Render as an Elasticsearch index-creation body (settings + mappings).
    pub fn to_index_body(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let kind = match field.field_type {
                FieldType::Keyword => "keyword",
                FieldType::Text => "text",
            };
            properties.insert(field.name.clone(), json!({ "type": kind }));
        }

        json!({
            "settings": {
                "number_of_shards": self.number_of_shards,
                "number_of_replicas": self.number_of_replicas,
            },
            "mappings": {
                "properties": properties,
            }
        })
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::qa_corpus()
    }
}
