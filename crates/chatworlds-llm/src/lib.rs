pub mod types;
pub mod traits;
pub mod error;
pub mod config;
pub mod openrouter;
pub mod proxy;

pub use traits::{
    CompletionClient,
    ModelRelay,
    CompletionRequest, CompletionOptions, Completion,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_MAX_TOKENS,
};

pub use error::{RelayError, RelayErrorBody};
pub use config::RelayConfig;
pub use openrouter::OpenRouterClient;
pub use proxy::{ProxyRelay, RelayRequest, RelayResponse};
pub use types::{ApiKey, ChatMessage, Role};
