use chatworlds_llm::DEFAULT_MODEL;
use serde::{Deserialize, Serialize};

/// System prompt stored on threads created without one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Title used when nothing better can be derived
pub const DEFAULT_THREAD_TITLE: &str = "New Conversation";

/// Assistant reply recorded in place of a completion when the relay fails
pub const RELAY_FAILURE_REPLY: &str = "Sorry, I encountered an error. Please check that your OpenRouter API key is configured correctly in Settings.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Model selected when a session starts
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
    /// Prepend the thread's system prompt to relay history
    #[serde(default = "default_true")]
    pub include_system_prompt: bool,
    #[serde(default = "default_failure_reply")]
    pub failure_reply: String,
    /// Capacity of the session event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_failure_reply() -> String {
    RELAY_FAILURE_REPLY.to_string()
}

fn default_event_capacity() -> usize {
    256
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            default_system_prompt: default_system_prompt(),
            include_system_prompt: true,
            failure_reply: default_failure_reply(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl ConversationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_system_prompt = prompt.into();
        self
    }

    pub fn with_system_prompt_in_history(mut self, enabled: bool) -> Self {
        self.include_system_prompt = enabled;
        self
    }

    pub fn with_failure_reply(mut self, reply: impl Into<String>) -> Self {
        self.failure_reply = reply.into();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
