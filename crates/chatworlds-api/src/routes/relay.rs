use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatworlds_llm::{ChatMessage, Completion, RelayError, DEFAULT_MODEL};

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

/// Body of the relay function. Same shape `ProxyRelay` sends.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RelayChatRequest {
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<ChatMessage>,
    /// Defaults to openai/gpt-4-turbo
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RelayChatResponse {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub usage: Option<serde_json::Value>,
}

impl From<Completion> for RelayChatResponse {
    fn from(completion: Completion) -> Self {
        Self {
            content: completion.content,
            model: completion.model,
            usage: completion.usage,
        }
    }
}

/// Relay a chat completion with the caller's stored OpenRouter key
///
/// The key never leaves the backend. Upstream failures come back with the
/// upstream status and `{error, code}`.
#[utoipa::path(
    post,
    path = "/relay/chat",
    request_body = RelayChatRequest,
    responses(
        (status = 200, description = "Completion", body = RelayChatResponse),
        (status = 400, description = "Empty messages or no API key on file"),
        (status = 401, description = "User not authenticated"),
        (status = 500, description = "Invalid response from OpenRouter API")
    ),
    tag = "relay"
)]
pub async fn relay_chat(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<RelayChatRequest>,
) -> ApiResult<Json<RelayChatResponse>> {
    if req.messages.is_empty() {
        return Err(RelayError::InvalidRequest("Messages array is required".to_string()).into());
    }

    let model = req
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    tracing::debug!(model = %model, messages = req.messages.len(), "Relay request");
    let completion = state.relay.complete(&user_id, req.messages, &model).await?;

    Ok(Json(completion.into()))
}
