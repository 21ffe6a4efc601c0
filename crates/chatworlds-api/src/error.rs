use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use chatworlds_core::ConversationError;
use chatworlds_llm::RelayError;
use chatworlds_persist::PersistError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Status, client-facing message and machine code
    fn parts(&self) -> (StatusCode, String, &'static str) {
        match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                RelayError::Unauthenticated.code(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "bad_request"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found"),
            ApiError::Relay(e) => relay_parts(e),
            ApiError::Persist(e) => persist_parts(e),
            ApiError::Conversation(e) => conversation_parts(e),
            ApiError::Config(msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                    "internal",
                )
            }
            ApiError::Internal => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "internal",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code) = self.parts();

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Upstream statuses pass through; bad requests carry their bare reason
fn relay_parts(err: &RelayError) -> (StatusCode, String, &'static str) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match err {
        RelayError::InvalidRequest(reason) => reason.clone(),
        RelayError::CredentialLookup(e) | RelayError::Config(e) => {
            tracing::error!("Relay setup error: {}", e);
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };
    (status, message, err.code())
}

fn persist_parts(err: &PersistError) -> (StatusCode, String, &'static str) {
    match err {
        PersistError::ThreadNotFound(_) | PersistError::CustomModelNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string(), "not_found")
        }
        PersistError::Unauthorized(_) => (
            StatusCode::FORBIDDEN,
            "Access denied".to_string(),
            "forbidden",
        ),
        PersistError::Unavailable(e) => {
            tracing::error!("Store unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage unavailable".to_string(),
                "store_unavailable",
            )
        }
        PersistError::Database(_) | PersistError::Serialization(_) | PersistError::Internal(_) => {
            tracing::error!("Persistence error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage error".to_string(),
                "internal",
            )
        }
    }
}

fn conversation_parts(err: &ConversationError) -> (StatusCode, String, &'static str) {
    match err {
        ConversationError::AuthRequired => (
            StatusCode::UNAUTHORIZED,
            "User not authenticated".to_string(),
            "unauthenticated",
        ),
        ConversationError::Busy { .. } => (StatusCode::CONFLICT, err.to_string(), "busy"),
        ConversationError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "bad_request"),
        ConversationError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), "not_found"),
        ConversationError::Persistence(e) => persist_parts(e),
        ConversationError::Build(msg) => {
            tracing::error!("Build error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            )
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_errors_keep_upstream_status() {
        let err = ApiError::from(RelayError::Upstream {
            status: 429,
            message: "Rate limit exceeded".to_string(),
        });
        let (status, message, code) = err.parts();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(message, "Rate limit exceeded (429)");
        assert_eq!(code, "upstream_error");
    }

    #[test]
    fn test_bad_relay_request_uses_bare_reason() {
        let err = ApiError::from(RelayError::InvalidRequest(
            "Messages array is required".to_string(),
        ));
        let (status, message, code) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Messages array is required");
        assert_eq!(code, "bad_request");
    }

    #[test]
    fn test_missing_credential_is_bad_request() {
        let (status, message, code) = ApiError::from(RelayError::MissingCredential).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            message,
            "OpenRouter API key not found. Please add it in Settings."
        );
        assert_eq!(code, "missing_credential");
    }

    #[test]
    fn test_busy_maps_to_conflict() {
        let err = ApiError::from(ConversationError::Busy { thread_id: None });
        assert_eq!(err.parts().0, StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_outage_hides_details() {
        let err = ApiError::from(PersistError::Unavailable("connection refused".to_string()));
        let (status, message, _) = err.parts();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(message, "Storage unavailable");
    }
}
