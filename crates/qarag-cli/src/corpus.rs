//! Corpus file loading

use std::fs;
use std::path::Path;

use qarag_core::{Document, Error, Result};

/// Read corpus documents from `path`.
///
/// Accepts either a JSON array of records or one JSON record per line.
/// Blank lines are skipped; a malformed line is reported with its line number.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let raw = fs::read_to_string(path)?;
    parse_corpus(&raw)
}

pub fn parse_corpus(raw: &str) -> Result<Vec<Document>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| Error::InvalidInput(format!("invalid corpus array: {}", e)));
    }

    let mut documents = Vec::new();
    for (number, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let document: Document = serde_json::from_str(line).map_err(|e| {
            Error::InvalidInput(format!("corpus line {}: {}", number + 1, e))
        })?;
        documents.push(document);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_json_array() {
        let raw = r#"[
            {"question_id": "Q1", "document_title": "Paris", "question": "What is the capital of France?", "answer": "Paris"},
            {"id": "Q2", "title": "Berlin", "question": "What is the capital of Germany?", "answer": "Berlin"}
        ]"#;
        let docs = parse_corpus(raw).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1], Document::new("Q2", "Berlin", "What is the capital of Germany?", "Berlin"));
    }

    #[test]
    fn test_json_lines_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"question_id": "Q1", "document_title": "Paris", "question": "q1", "answer": "a1"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"question_id": "Q2", "document_title": "Rome", "question": "q2", "answer": "a2"}}"#).unwrap();

        let docs = load_corpus(file.path()).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_malformed_line_reports_number() {
        let raw = "{\"question_id\": \"Q1\", \"document_title\": \"t\", \"question\": \"q\", \"answer\": \"a\"}\n\
                   {\"question_id\": \"Q2\"}\n";
        let err = parse_corpus(raw).unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.starts_with("corpus line 2:")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_corpus(Path::new("/nonexistent/corpus.jsonl")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
