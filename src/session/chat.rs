//! Chat log entries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Question,
    Answer,
    /// Session announcements, e.g. a player dropping out.
    System,
}

/// One line of the session's chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_name: String,
    pub text: String,
    pub kind: ChatKind,
}

impl ChatMessage {
    pub fn question(sender_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_name, text, ChatKind::Question)
    }

    pub fn answer(sender_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(sender_name, text, ChatKind::Answer)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(String::new(), text, ChatKind::System)
    }

    fn new(sender_name: impl Into<String>, text: impl Into<String>, kind: ChatKind) -> Self {
        Self {
            sender_name: sender_name.into(),
            text: text.into(),
            kind,
        }
    }
}
