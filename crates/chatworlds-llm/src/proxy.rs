// Client side of the relay function: the caller never sees the API key,
// the backend injects it after authenticating the bearer token.

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::traits::{Completion, ModelRelay};
use crate::types::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Body accepted by the relay function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Success body of the relay function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

impl From<Completion> for RelayResponse {
    fn from(completion: Completion) -> Self {
        Self {
            content: completion.content,
            model: completion.model,
            usage: completion.usage,
        }
    }
}

/// [`ModelRelay`] that forwards to a deployed relay function.
///
/// One instance per signed-in session: it carries that session's access token.
pub struct ProxyRelay {
    http_client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl ProxyRelay {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        Self::with_config(endpoint, access_token, &RelayConfig::default())
    }

    pub fn with_config(
        endpoint: impl Into<String>,
        access_token: impl Into<String>,
        config: &RelayConfig,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl ModelRelay for ProxyRelay {
    async fn complete(
        &self,
        _owner: &str,
        history: Vec<ChatMessage>,
        model_id: &str,
    ) -> Result<Completion> {
        let request = RelayRequest {
            messages: history,
            model: Some(model_id.to_string()),
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = RelayError::from_body(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), code = err.code(), "Relay function returned an error");
            return Err(err);
        }

        let parsed: RelayResponse =
            serde_json::from_str(&body).map_err(|_| RelayError::InvalidUpstreamResponse)?;

        Ok(Completion {
            content: parsed.content,
            model: parsed.model,
            usage: parsed.usage,
        })
    }
}
