//! Conversation session and terminal interface for QARAG

mod corpus;
mod session;
mod ui;

#[cfg(test)]
mod tests;

pub use corpus::{load_corpus, parse_corpus};
pub use session::{ConversationSession, SessionConfig, SessionState};
pub use ui::{
    display_banner, format_history, format_sources, handle_input_with_history, print_help,
    print_history, EditOutcome, LineEditor,
};

// Re-export core types
pub use qarag_core::{ConversationTurn, Error, Result};
