//! Session state and turn types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Conversational and emotional state of one user between two welcomes.
///
/// `emotions` holds canonical labels with no two equal ignoring case, and
/// `situations[i]` is the message that introduced `emotions[i]`.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Owner email; `None` for one-off sessions of chats that name no user.
    pub user_id: Option<String>,
    /// Ordered conversation, oldest first.
    pub turns: Vec<Turn>,
    /// First user message of the session.
    pub first_message: Option<String>,
    /// Distinct emotions in detection order.
    pub emotions: Vec<String>,
    /// Triggering message per detected emotion.
    pub situations: Vec<String>,
    /// Id of the ledger document mirroring this session.
    pub ledger_doc_id: Option<String>,
    /// When the session was opened.
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id,
            turns: Vec::new(),
            first_message: None,
            emotions: Vec::new(),
            situations: Vec::new(),
            ledger_doc_id: None,
            started_at: Utc::now(),
        }
    }

    /// Case-insensitive emotion membership.
    pub fn has_emotion(&self, label: &str) -> bool {
        let needle = label.to_lowercase();
        self.emotions.iter().any(|e| e.to_lowercase() == needle)
    }

    /// Owner id if set and non-empty.
    pub fn owner(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Output of composing one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// Text returned to the caller.
    pub reply: String,
    /// Emotion classified this turn, if any.
    pub emotion: Option<String>,
}

impl Composition {
    pub fn plain(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            emotion: None,
        }
    }
}
