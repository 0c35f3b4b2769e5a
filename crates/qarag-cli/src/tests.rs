//! Snapshot tests for session transcripts

#[cfg(test)]
mod snapshot_tests {
    use crate::{format_history, ConversationSession, SessionConfig};
    use async_trait::async_trait;
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use qarag_core::{
        Document, GenerationResult, IndexSchema, LLMProvider, Result, SearchBackend,
    };
    use qarag_rag::{LocalSearchBackend, RetrievalEngine};
    use std::sync::Arc;

    /// Answers with the first context line of the prompt
    struct EchoProvider;

    #[async_trait]
    impl LLMProvider for EchoProvider {
        async fn generate(&self, prompt: &str, model_id: &str) -> Result<GenerationResult> {
            let text = prompt
                .lines()
                .find(|line| line.starts_with("Answer: "))
                .map(|line| line.trim_start_matches("Answer: ").to_string())
                .unwrap_or_else(|| "I don't know.".to_string());
            Ok(GenerationResult {
                text,
                model_id: model_id.to_string(),
                tokens_used: None,
            })
        }

        fn default_model(&self) -> &str {
            "echo"
        }
    }

    async fn session() -> ConversationSession {
        let backend = LocalSearchBackend::in_memory();
        backend
            .create_index("wiki_qa_questions", &IndexSchema::qa_corpus())
            .await
            .unwrap();
        backend
            .upsert(
                "wiki_qa_questions",
                &Document::new("Q1", "Paris", "What is the capital of France?", "Paris"),
            )
            .await
            .unwrap();

        ConversationSession::new(
            Arc::new(RetrievalEngine::new(Arc::new(backend))),
            Arc::new(EchoProvider),
            SessionConfig {
                index_name: "wiki_qa_questions".to_string(),
                top_k: 5,
                model_id: "echo".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_transcript_snapshot() {
        let mut session = session().await;
        session.submit("capital of France").await.unwrap();
        session.submit("who wrote Hamlet").await.unwrap();

        assert_snapshot!(format_history(session.history()), @r###"
        [you] capital of France
        [assistant] Paris
        [you] who wrote Hamlet
        [assistant] I don't know.
        "###);
    }

    #[tokio::test]
    async fn test_history_serialization_snapshot() {
        let mut session = session().await;
        session.submit("capital of France").await.unwrap();

        assert_yaml_snapshot!(session.history(), @r###"
        ---
        - role: user
          content: capital of France
        - role: assistant
          content: Paris
        "###);
    }
}
