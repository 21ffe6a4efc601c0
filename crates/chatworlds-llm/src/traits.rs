use crate::error::Result;
use crate::types::{ApiKey, ChatMessage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling temperature forwarded on every relay call
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Completion length cap forwarded on every relay call
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Model used when a relay request names none
pub const DEFAULT_MODEL: &str = "openai/gpt-4-turbo";

/// Direct access to the external completion API with an explicit key
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, api_key: &ApiKey, request: CompletionRequest) -> Result<Completion>;
}

/// Boundary that turns a history and a model id into one completion.
///
/// Implementations resolve the caller's credential themselves, so callers
/// only pass the owner id. Calls are independent: nothing is shared between
/// two in-flight `complete` calls.
#[async_trait]
pub trait ModelRelay: Send + Sync {
    async fn complete(
        &self,
        owner: &str,
        history: Vec<ChatMessage>,
        model_id: &str,
    ) -> Result<Completion>;
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }
}

/// Normalized success result. Only `content` is required by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: None,
            usage: None,
        }
    }
}
