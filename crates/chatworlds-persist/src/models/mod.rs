mod thread;
mod message;
mod custom_model;
mod credential;

// Export database-agnostic models
pub use thread::{NewThread, Thread, ThreadPatch};
pub use message::{Message, MessageRole, NewMessage};
pub use custom_model::{CustomModel, CustomModelInput};
pub use credential::Credential;
