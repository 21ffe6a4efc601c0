use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// No session owner, or the record belongs to someone else
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Custom model not found: {0}")]
    CustomModelNotFound(String),

    /// Backing store unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ThreadNotFound(_) | Self::CustomModelNotFound(_))
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for PersistError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match *err.kind {
            ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
                Self::Unavailable(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<bson::ser::Error> for PersistError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;

/// Reject calls made without a signed-in owner
pub(crate) fn require_owner(owner: &str) -> Result<&str> {
    if owner.trim().is_empty() {
        return Err(PersistError::Unauthorized("no session owner".to_string()));
    }
    Ok(owner)
}
