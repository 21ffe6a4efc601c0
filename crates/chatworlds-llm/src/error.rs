use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label used when the upstream error body carries no readable message
pub const GENERIC_UPSTREAM_ERROR: &str = "OpenRouter API error";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No API key stored for the caller. Raised before any network call.
    #[error("OpenRouter API key not found. Please add it in Settings.")]
    MissingCredential,

    #[error("{message} ({status})")]
    Upstream { status: u16, message: String },

    #[error("Invalid response from OpenRouter API")]
    InvalidUpstreamResponse,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential lookup failed: {0}")]
    CredentialLookup(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RelayError {
    /// Machine-readable code carried in relay error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Upstream { .. } => "upstream_error",
            Self::InvalidUpstreamResponse => "invalid_upstream",
            Self::Transport(_) => "transport",
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidRequest(_) => "bad_request",
            Self::CredentialLookup(_) | Self::Config(_) => "internal",
        }
    }

    /// HTTP status the relay function answers with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingCredential | Self::InvalidRequest(_) => 400,
            Self::Unauthenticated => 401,
            Self::Upstream { status, .. } => *status,
            Self::Transport(_) => 502,
            Self::InvalidUpstreamResponse | Self::CredentialLookup(_) | Self::Config(_) => 500,
        }
    }

    pub fn to_body(&self) -> RelayErrorBody {
        RelayErrorBody {
            error: self.to_string(),
            code: Some(self.code().to_string()),
        }
    }

    /// Rebuild the error from a relay function response.
    ///
    /// Bodies without a `code` (or unparseable bodies) become `Upstream` with
    /// the HTTP status, mirroring how the relay function itself treats an
    /// opaque upstream failure.
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<RelayErrorBody> = serde_json::from_str(body).ok();
        let Some(parsed) = parsed else {
            return Self::Upstream {
                status,
                message: GENERIC_UPSTREAM_ERROR.to_string(),
            };
        };

        match parsed.code.as_deref() {
            Some("missing_credential") => Self::MissingCredential,
            Some("unauthenticated") => Self::Unauthenticated,
            Some("invalid_upstream") => Self::InvalidUpstreamResponse,
            Some("bad_request") => Self::InvalidRequest(parsed.error),
            Some("transport") => Self::Transport(parsed.error),
            _ => {
                let suffix = format!(" ({})", status);
                let message = parsed
                    .error
                    .strip_suffix(&suffix)
                    .map(str::to_string)
                    .unwrap_or(parsed.error);
                Self::Upstream { status, message }
            }
        }
    }
}

/// Serializes as its relay error body
impl Serialize for RelayError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_body().serialize(serializer)
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// `{error}` body of a failed relay call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub type Result<T> = std::result::Result<T, RelayError>;
