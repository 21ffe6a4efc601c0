// Connection settings for the OpenRouter client and the relay proxy client

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// Configuration for [`crate::OpenRouterClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL, defaults to https://openrouter.ai/api/v1
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `HTTP-Referer` (OpenRouter app attribution)
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Sent as `X-Title`
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    OPENROUTER_API_BASE.to_string()
}

fn default_referer() -> String {
    "https://chat-worlds.lovableproject.com".to_string()
}

fn default_title() -> String {
    "Chat Worlds".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            referer: default_referer(),
            title: default_title(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
