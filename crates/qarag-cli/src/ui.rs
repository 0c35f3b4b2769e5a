//! Terminal UI for the chat loop

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use qarag_core::{ConversationTurn, Document, Result, Role};

const PROMPT: &str = "qarag>";

/// Display startup banner
pub fn display_banner(index_name: &str, model_id: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);
    let inner = banner_width - 2;

    println!();
    println!("{}", format!("┌{}┐", "─".repeat(inner)).blue());

    let lines = [
        "QARAG - FAQ question answering".to_string(),
        String::new(),
        format!("Index: {}", index_name),
        format!("Model: {}", model_id),
        String::new(),
        "Answers are grounded in retrieved FAQ entries only.".to_string(),
        "↑/↓ recalls input, Esc clears the line, Ctrl-D quits.".to_string(),
    ];
    for line in lines {
        let width = line.chars().count();
        let padding = inner.saturating_sub(width + 2);
        println!("{}", format!("│  {}{}│", line, " ".repeat(padding)).blue());
    }

    println!("{}", format!("└{}┘", "─".repeat(inner)).blue());
    println!();
    println!("{}", "Type a question, or 'help' for commands".dimmed());
    println!();
}

/// Result of feeding one key to a [`LineEditor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Pending,
    Submitted(String),
    /// Esc or Ctrl-C: drop the line
    Cancelled,
    /// Ctrl-D on an empty line
    EndOfInput,
}

/// Single-line editor with recall of earlier inputs.
///
/// The cursor is a char index, not a byte offset.
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: Vec<char>,
    cursor: usize,
    recall: Option<usize>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent, history: &[String]) -> EditOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => EditOutcome::Cancelled,
                KeyCode::Char('d') if self.buffer.is_empty() => EditOutcome::EndOfInput,
                _ => EditOutcome::Pending,
            };
        }

        match key.code {
            KeyCode::Enter => return EditOutcome::Submitted(self.line()),
            KeyCode::Esc => return EditOutcome::Cancelled,
            KeyCode::Char(c) => {
                self.buffer.insert(self.cursor, c);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.buffer.remove(self.cursor);
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            KeyCode::Up if !history.is_empty() => {
                let index = match self.recall {
                    None => history.len() - 1,
                    Some(i) => i.saturating_sub(1),
                };
                self.recall = Some(index);
                self.replace(&history[index]);
            }
            KeyCode::Down => {
                if let Some(i) = self.recall {
                    if i + 1 < history.len() {
                        self.recall = Some(i + 1);
                        self.replace(&history[i + 1]);
                    } else {
                        self.recall = None;
                        self.replace("");
                    }
                }
            }
            _ => {}
        }
        EditOutcome::Pending
    }

    fn replace(&mut self, text: &str) {
        self.buffer = text.chars().collect();
        self.cursor = self.buffer.len();
    }

    fn redraw(&self) -> io::Result<()> {
        let line = self.line();
        let back = self.buffer.len() - self.cursor;
        print!("\r\x1b[2K{} {}", PROMPT.green().bold(), line);
        if back > 0 {
            print!("\x1b[{}D", back);
        }
        io::stdout().flush()
    }
}

/// Restores cooked mode however the read loop exits
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Read one line, with ↑/↓ recall over `history`.
///
/// Returns `None` at end of input or Ctrl-D. Esc and Ctrl-C return an empty line.
pub fn handle_input_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    let mut editor = LineEditor::new();
    let outcome = {
        let _raw = RawModeGuard::enable()?;
        editor.redraw()?;
        loop {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                match editor.handle_key(key_event, history) {
                    EditOutcome::Pending => editor.redraw()?,
                    done => break done,
                }
            }
        }
    };
    println!();

    match outcome {
        EditOutcome::Submitted(line) => {
            let line = line.trim().to_string();
            if !line.is_empty() {
                history.push(line.clone());
            }
            Ok(Some(line))
        }
        EditOutcome::EndOfInput => Ok(None),
        _ => Ok(Some(String::new())),
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the FAQ corpus", "<question>".green());
    println!("  {} - Show this conversation so far", "history".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  What is the capital of France?");
    println!("  how are glacier caves formed");
}

/// Render turns in the order they were recorded
pub fn format_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let label = match turn.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            format!("[{}] {}", label, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_history(turns: &[ConversationTurn]) {
    if turns.is_empty() {
        println!("{}", "No turns yet.".dimmed());
        return;
    }
    println!("{}", format_history(turns));
}

/// Titles of the documents an answer was grounded on
pub fn format_sources(sources: &[Document]) -> String {
    sources
        .iter()
        .map(|doc| format!("{} ({})", doc.title, doc.id))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_str(editor: &mut LineEditor, text: &str) {
        for c in text.chars() {
            editor.handle_key(press(KeyCode::Char(c)), &[]);
        }
    }

    #[test]
    fn test_editing_multibyte_input() {
        let mut editor = LineEditor::new();
        type_str(&mut editor, "café?");
        editor.handle_key(press(KeyCode::Backspace), &[]);
        editor.handle_key(press(KeyCode::Left), &[]);
        editor.handle_key(press(KeyCode::Char('x')), &[]);
        assert_eq!(editor.line(), "cafxé");
        assert_eq!(
            editor.handle_key(press(KeyCode::Enter), &[]),
            EditOutcome::Submitted("cafxé".to_string())
        );
    }

    #[test]
    fn test_history_recall() {
        let history = vec!["first".to_string(), "second".to_string()];
        let mut editor = LineEditor::new();

        editor.handle_key(press(KeyCode::Up), &history);
        assert_eq!(editor.line(), "second");
        editor.handle_key(press(KeyCode::Up), &history);
        editor.handle_key(press(KeyCode::Up), &history);
        assert_eq!(editor.line(), "first");
        editor.handle_key(press(KeyCode::Down), &history);
        assert_eq!(editor.line(), "second");
        editor.handle_key(press(KeyCode::Down), &history);
        assert_eq!(editor.line(), "");
    }

    #[test]
    fn test_escape_cancels() {
        let mut editor = LineEditor::new();
        type_str(&mut editor, "abc");
        assert_eq!(editor.handle_key(press(KeyCode::Esc), &[]), EditOutcome::Cancelled);
    }

    #[test]
    fn test_control_keys_are_not_typed() {
        let mut editor = LineEditor::new();
        type_str(&mut editor, "abc");

        // Ctrl-D only ends input on an empty line.
        assert_eq!(editor.handle_key(ctrl('d'), &[]), EditOutcome::Pending);
        assert_eq!(editor.line(), "abc");
        assert_eq!(editor.handle_key(ctrl('c'), &[]), EditOutcome::Cancelled);
        assert_eq!(editor.line(), "abc");

        let mut empty = LineEditor::new();
        assert_eq!(empty.handle_key(ctrl('d'), &[]), EditOutcome::EndOfInput);
    }

    #[test]
    fn test_format_sources() {
        let sources = vec![
            Document::new("Q1", "Paris", "q", "a"),
            Document::new("Q7", "Lyon", "q", "a"),
        ];
        assert_eq!(format_sources(&sources), "Paris (Q1), Lyon (Q7)");
    }
}
