//! Grounding context and prompt assembly

use qarag_core::{Document, Error, Result};

/// Instruction template; `{question}` and `{context}` are substituted.
pub const DEFAULT_TEMPLATE: &str = "You're an AI assistant.
Answer the user QUESTION based on CONTEXT - the documents retrieved from our FAQ database.
Don't use other information outside of the provided CONTEXT.

QUESTION: {question}

CONTEXT:

{context}";

/// Renders ranked documents into one grounding text block
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// One `Title:`/`Question:`/`Answer:` block per document, in rank order,
    /// separated by blank lines. Empty input gives an empty string.
    pub fn build_context(&self, documents: &[Document]) -> String {
        let mut context = String::new();
        for doc in documents {
            context.push_str(&format!(
                "Title: {}\nQuestion: {}\nAnswer: {}\n\n",
                doc.title, doc.question, doc.answer
            ));
        }
        context.trim().to_string()
    }
}

/// Embeds a question and its grounding context into the instruction template
#[derive(Debug, Clone)]
pub struct PromptAugmenter {
    template: String,
}

impl PromptAugmenter {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }

    /// Use a custom template; it must contain both `{question}` and `{context}`.
    pub fn with_template(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in ["{question}", "{context}"] {
            if !template.contains(placeholder) {
                return Err(Error::Configuration(format!(
                    "prompt template is missing the {} placeholder",
                    placeholder
                )));
            }
        }
        Ok(Self { template })
    }

    /// Build the generation request. An empty context still yields a complete prompt.
    pub fn augment(&self, question: &str, context: &str) -> String {
        // Context goes in first so a literal "{question}" inside it survives.
        self.template
            .replacen("{question}", "\u{0}QUESTION\u{0}", 1)
            .replacen("{context}", context, 1)
            .replacen("\u{0}QUESTION\u{0}", question, 1)
            .trim()
            .to_string()
    }
}

impl Default for PromptAugmenter {
    fn default() -> Self {
        Self::new()
    }
}
