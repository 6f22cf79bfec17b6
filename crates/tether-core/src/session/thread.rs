//! Conversation threads and messages.
//!
//! The message wire format belongs to the chat layer; the engine only keeps
//! enough of it to track the current thread and a local history.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// A single message in a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format)
    #[serde(default)]
    pub created_at: String,
}

impl Message {
    /// Creates a message stamped with the current time.
    pub fn now(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A conversation thread, unique per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub thread_id: String,
    /// ISO 8601
    #[serde(default)]
    pub created_at: String,
    /// ISO 8601, absent until the first message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Thread {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            last_message_at: None,
            messages: Vec::new(),
        }
    }
}
