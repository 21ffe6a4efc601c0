use std::sync::Arc;

use chatworlds_llm::ModelRelay;
use chatworlds_persist::Store;
use chatworlds_types::ConversationConfig;

use crate::conversation::Conversation;
use crate::error::{ConversationError, Result};
use crate::turn::TurnRunner;

/// Builder for constructing a Conversation session
pub struct ConversationBuilder {
    store: Option<Arc<dyn Store>>,
    relay: Option<Arc<dyn ModelRelay>>,
    config: ConversationConfig,
}

impl ConversationBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            relay: None,
            config: ConversationConfig::default(),
        }
    }

    /// Set the thread, message, custom model and credential store
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the model relay
    pub fn relay(mut self, relay: Arc<dyn ModelRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn config(mut self, config: ConversationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build_runner(self) -> Result<TurnRunner> {
        let store = self
            .store
            .ok_or_else(|| ConversationError::Build("store is required".to_string()))?;
        let relay = self
            .relay
            .ok_or_else(|| ConversationError::Build("relay is required".to_string()))?;

        Ok(TurnRunner::new(store, relay, self.config))
    }

    pub fn build(self) -> Result<Conversation> {
        Ok(Conversation::new(self.build_runner()?))
    }
}

impl Default for ConversationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
