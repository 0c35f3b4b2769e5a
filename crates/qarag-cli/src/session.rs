//! Conversation session: one retrieval and one generation per user turn

use std::sync::Arc;
use tracing::{info, warn};

use qarag_core::{ConversationTurn, Document, LLMProvider, Result, Settings};
use qarag_rag::{ContextBuilder, PromptAugmenter, RetrievalEngine};

/// Where a session is within the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingRetrieval,
    AwaitingGeneration,
}

/// Per-session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub index_name: String,
    pub top_k: usize,
    pub model_id: String,
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            index_name: settings.index_name.clone(),
            top_k: settings.top_k,
            model_id: settings.model_id.clone(),
        }
    }
}

/// Owns one conversation's history and drives
/// retrieve → build context → augment → generate for each question.
///
/// Backends are shared between sessions; the turn history is not.
pub struct ConversationSession {
    retrieval: Arc<RetrievalEngine>,
    generator: Arc<dyn LLMProvider>,
    config: SessionConfig,
    context_builder: ContextBuilder,
    augmenter: PromptAugmenter,
    history: Vec<ConversationTurn>,
    state: SessionState,
    last_sources: Vec<Document>,
}

impl ConversationSession {
    pub fn new(
        retrieval: Arc<RetrievalEngine>,
        generator: Arc<dyn LLMProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            retrieval,
            generator,
            config,
            context_builder: ContextBuilder::new(),
            augmenter: PromptAugmenter::new(),
            history: Vec::new(),
            state: SessionState::Idle,
            last_sources: Vec::new(),
        }
    }

    pub fn with_augmenter(mut self, augmenter: PromptAugmenter) -> Self {
        self.augmenter = augmenter;
        self
    }

    /// Answer one question.
    ///
    /// The user turn is always recorded. The assistant turn is recorded only
    /// when generation succeeds; on failure the stage error is returned, the
    /// session goes back to `Idle`, and the history shows the turn unanswered.
    pub async fn submit(&mut self, question: &str) -> Result<String> {
        self.history.push(ConversationTurn::user(question));
        self.last_sources.clear();

        let outcome = self.run_turn(question).await;
        self.state = SessionState::Idle;

        match outcome {
            Ok(answer) => {
                self.history.push(ConversationTurn::assistant(answer.clone()));
                Ok(answer)
            }
            Err(e) => {
                warn!(error = %e, "turn did not complete");
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self, question: &str) -> Result<String> {
        self.state = SessionState::AwaitingRetrieval;
        let documents = self
            .retrieval
            .retrieve(question, &self.config.index_name, self.config.top_k)
            .await?;

        self.state = SessionState::AwaitingGeneration;
        let context = self.context_builder.build_context(&documents);
        let prompt = self.augmenter.augment(question, &context);
        info!(sources = documents.len(), model = %self.config.model_id, "generating answer");
        self.last_sources = documents;

        let generated = self
            .generator
            .generate(&prompt, &self.config.model_id)
            .await?;
        Ok(generated.text)
    }

    /// Turns in insertion order
    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Documents that grounded the most recent turn
    pub fn last_sources(&self) -> &[Document] {
        &self.last_sources
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
