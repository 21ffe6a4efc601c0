pub mod message;
pub mod secret;

pub use message::{ChatMessage, Role};
pub use secret::ApiKey;
