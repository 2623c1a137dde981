//! Conversation history for a single call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a turn in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// An append-only record of the spoken conversation.
///
/// Turns arrive from the speech agent as transcription and response events.
/// The only permitted mutation besides appending is replacing the text of the
/// most recent assistant turn, which the agent requests when it corrects an
/// utterance it has already committed.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Appends an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    /// Replaces the text of the most recent assistant turn.
    ///
    /// Returns `false` when there is no assistant turn to correct.
    pub fn correct_last_assistant(&mut self, content: impl Into<String>) -> bool {
        match self
            .turns
            .iter_mut()
            .rev()
            .find(|turn| turn.role == Role::Assistant)
        {
            Some(turn) => {
                turn.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Discards every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
