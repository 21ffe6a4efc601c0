use chatworlds_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversationError {
    /// No signed-in user on the session
    #[error("Authentication required")]
    AuthRequired,

    /// A send is already in flight for this thread, or an auto-create send is pending
    #[error("A message is already being sent")]
    Busy { thread_id: Option<String> },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistError),

    #[error("Build error: {0}")]
    Build(String),
}

impl ConversationError {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

pub type Result<T> = std::result::Result<T, ConversationError>;
