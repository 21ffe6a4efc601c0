use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use chatworlds_llm::{ChatMessage, Role};

/// Database-agnostic message model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Set on assistant messages only: the model that produced (or failed to produce) it
    pub model_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted roles. System turns are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub model_id: Option<String>,
}

impl NewMessage {
    pub fn user(thread_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            role: MessageRole::User,
            content: content.into(),
            model_id: None,
        }
    }

    pub fn assistant(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            role: MessageRole::Assistant,
            content: content.into(),
            model_id: Some(model_id.into()),
        }
    }
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Role::User,
            MessageRole::Assistant => Role::Assistant,
        }
    }
}

// Conversion: persisted Message → relay history entry
impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        ChatMessage::new(msg.role.into(), msg.content.clone())
    }
}
