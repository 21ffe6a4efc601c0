use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatworlds_core::{NoopObserver, SendOutcome, SendReport};
use chatworlds_persist::{Message, MessageRole, MessageStore, Thread};

use crate::routes::threads::{find_thread, thread_to_response, ThreadResponse};
use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message_id: String,
    pub thread_id: String,
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
    pub model_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMessagesResponse {
    /// Oldest first
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// Omit to start a new thread titled after the message
    #[serde(default)]
    pub thread_id: Option<String>,
    pub content: String,
    /// Defaults to the configured model
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadMessageRequest {
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RelayFailure {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    /// "completed", or "ignored" for blank content
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadResponse>,
    pub created_thread: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<MessageResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_message: Option<MessageResponse>,
    /// Set when the relay failed and the stored reply is the failure notice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_error: Option<RelayFailure>,
}

/// List messages in a thread
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "List of messages", body = ListMessagesResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ListMessagesResponse>> {
    let thread = find_thread(&state, &user_id, &thread_id).await?;
    let messages = state.store.list_messages(&user_id, &thread.id).await?;

    Ok(Json(ListMessagesResponse {
        messages: messages.into_iter().map(message_to_response).collect(),
    }))
}

/// Send a message, creating a thread when none is given
#[utoipa::path(
    post,
    path = "/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Turn recorded", body = SendMessageResponse),
        (status = 200, description = "Blank content ignored", body = SendMessageResponse),
        (status = 404, description = "Thread not found"),
        (status = 409, description = "A message is already being sent")
    ),
    tag = "messages"
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    let thread = match req.thread_id.as_deref() {
        Some(thread_id) => Some(find_thread(&state, &user_id, thread_id).await?),
        None => None,
    };
    run_turn(&state, &user_id, thread, &req.content, req.model).await
}

/// Send a message into an existing thread
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/messages",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = ThreadMessageRequest,
    responses(
        (status = 201, description = "Turn recorded", body = SendMessageResponse),
        (status = 404, description = "Thread not found"),
        (status = 409, description = "A message is already being sent")
    ),
    tag = "messages"
)]
pub async fn send_thread_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(thread_id): Path<String>,
    Json(req): Json<ThreadMessageRequest>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    let thread = find_thread(&state, &user_id, &thread_id).await?;
    run_turn(&state, &user_id, Some(thread), &req.content, req.model).await
}

async fn run_turn(
    state: &AppState,
    user_id: &str,
    thread: Option<Thread>,
    content: &str,
    model: Option<String>,
) -> ApiResult<(StatusCode, Json<SendMessageResponse>)> {
    let model_id = model
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| state.runner.config().default_model.clone());

    let outcome = state
        .runner
        .send(user_id, thread, content, &model_id, &NoopObserver)
        .await?;

    Ok(match outcome {
        SendOutcome::Ignored => (StatusCode::OK, Json(ignored_response())),
        SendOutcome::Completed(report) => (StatusCode::CREATED, Json(report_to_response(report))),
    })
}

fn ignored_response() -> SendMessageResponse {
    SendMessageResponse {
        status: "ignored".to_string(),
        thread: None,
        created_thread: false,
        user_message: None,
        assistant_message: None,
        relay_error: None,
    }
}

fn report_to_response(report: SendReport) -> SendMessageResponse {
    SendMessageResponse {
        status: "completed".to_string(),
        thread: Some(thread_to_response(report.thread)),
        created_thread: report.created_thread,
        user_message: Some(message_to_response(report.user_message)),
        assistant_message: Some(message_to_response(report.assistant_message)),
        relay_error: report.relay_error.map(|e| RelayFailure {
            error: e.to_string(),
            code: e.code().to_string(),
        }),
    }
}

fn message_to_response(message: Message) -> MessageResponse {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    MessageResponse {
        message_id: message.id,
        thread_id: message.thread_id,
        role: role.to_string(),
        content: message.content,
        model_id: message.model_id,
        created_at: message.created_at,
    }
}
