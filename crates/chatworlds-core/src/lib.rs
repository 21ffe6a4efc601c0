pub mod builder;
pub mod catalog;
pub mod conversation;
pub mod error;
pub mod relay;
pub mod settings;
pub mod title;
pub mod turn;

pub use builder::ConversationBuilder;
pub use catalog::{builtin_models, ModelCatalog, ModelInfo, Tier};
pub use conversation::{validate_custom_model, Conversation, SessionSnapshot};
pub use error::{ConversationError, Result};
pub use relay::CredentialRelay;
pub use settings::CredentialSettings;
pub use title::derive_title;
pub use turn::{NoopObserver, SendOutcome, SendReport, TurnObserver, TurnRunner};

// Re-export key types from chatworlds-types
pub use chatworlds_types::{ConversationConfig, Notice, NoticeLevel, SessionEvent};
