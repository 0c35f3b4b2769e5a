//! End-to-end snapshot tests for the search-side pipeline

#[cfg(test)]
mod snapshot_tests {
    use crate::{
        ConnectionManager, ContextBuilder, CorpusIndexer, Document, IndexSchema, LocalConnector,
        PromptAugmenter, RetrievalEngine, RetryPolicy,
    };
    use insta::assert_snapshot;
    use std::time::Duration;

    #[tokio::test]
    async fn test_index_retrieve_augment_snapshot() {
        let manager = ConnectionManager::new(
            LocalConnector::new(None),
            RetryPolicy::new(3, Duration::from_millis(1)),
        );
        let backend = manager.connect().await.unwrap();

        let indexer = CorpusIndexer::new(backend.clone());
        indexer
            .ensure_index("wiki_qa_questions", &IndexSchema::qa_corpus())
            .await
            .unwrap();
        let report = indexer
            .upsert(
                "wiki_qa_questions",
                &[Document::new(
                    "Q1",
                    "Paris",
                    "What is the capital of France?",
                    "Paris",
                )],
            )
            .await
            .unwrap();
        assert!(report.is_complete());

        let engine = RetrievalEngine::new(backend);
        let docs = engine
            .retrieve("capital of France", "wiki_qa_questions", 5)
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "Q1");

        let context = ContextBuilder::new().build_context(&docs);
        let prompt = PromptAugmenter::new().augment("capital of France", &context);

        assert_snapshot!(prompt, @r###"
        You're an AI assistant.
        Answer the user QUESTION based on CONTEXT - the documents retrieved from our FAQ database.
        Don't use other information outside of the provided CONTEXT.

        QUESTION: capital of France

        CONTEXT:

        Title: Paris
        Question: What is the capital of France?
        Answer: Paris
        "###);
    }

    #[test]
    fn test_empty_context_prompt_snapshot() {
        let prompt = PromptAugmenter::new().augment("Who painted the Mona Lisa?", "");

        assert_snapshot!(prompt, @r###"
        You're an AI assistant.
        Answer the user QUESTION based on CONTEXT - the documents retrieved from our FAQ database.
        Don't use other information outside of the provided CONTEXT.

        QUESTION: Who painted the Mona Lisa?

        CONTEXT:
        "###);
    }
}
