pub mod config;
pub mod events;

pub use config::{
    ConversationConfig, DEFAULT_SYSTEM_PROMPT, DEFAULT_THREAD_TITLE, RELAY_FAILURE_REPLY,
};
pub use events::{Notice, NoticeLevel, SessionEvent};
