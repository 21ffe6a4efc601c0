use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatworlds_persist::{NewThread, Thread, ThreadPatch, ThreadStore};
use chatworlds_types::DEFAULT_THREAD_TITLE;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateThreadRequest {
    /// Defaults to "New Conversation"
    #[serde(default)]
    pub title: Option<String>,
    /// Defaults to the configured system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RenameThreadRequest {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ThreadResponse {
    pub thread_id: String,
    pub title: String,
    pub system_prompt: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListThreadsResponse {
    /// Most recently active first
    pub threads: Vec<ThreadResponse>,
}

/// Create a new thread
#[utoipa::path(
    post,
    path = "/threads",
    request_body = CreateThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = ThreadResponse),
        (status = 401, description = "User not authenticated")
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateThreadRequest>,
) -> ApiResult<(StatusCode, Json<ThreadResponse>)> {
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string());
    let system_prompt = req
        .system_prompt
        .unwrap_or_else(|| state.config.conversation.default_system_prompt.clone());

    let thread = state
        .store
        .create_thread(&user_id, NewThread::new(title).with_system_prompt(system_prompt))
        .await?;

    tracing::info!(thread_id = %thread.id, "Thread created");
    Ok((StatusCode::CREATED, Json(thread_to_response(thread))))
}

/// List the caller's threads
#[utoipa::path(
    get,
    path = "/threads",
    responses(
        (status = 200, description = "List of threads", body = ListThreadsResponse),
        (status = 401, description = "User not authenticated")
    ),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ListThreadsResponse>> {
    let threads = state.store.list_threads(&user_id).await?;

    Ok(Json(ListThreadsResponse {
        threads: threads.into_iter().map(thread_to_response).collect(),
    }))
}

/// Get a specific thread by ID
#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 200, description = "Thread details", body = ThreadResponse),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ThreadResponse>> {
    let thread = find_thread(&state, &user_id, &thread_id).await?;
    Ok(Json(thread_to_response(thread)))
}

/// Rename a thread
#[utoipa::path(
    patch,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    request_body = RenameThreadRequest,
    responses(
        (status = 200, description = "Thread renamed", body = ThreadResponse),
        (status = 400, description = "Title is empty"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn rename_thread(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(thread_id): Path<String>,
    Json(req): Json<RenameThreadRequest>,
) -> ApiResult<Json<ThreadResponse>> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }

    let thread = state
        .store
        .update_thread(&user_id, &thread_id, ThreadPatch::title(title))
        .await?;

    Ok(Json(thread_to_response(thread)))
}

/// Delete a thread and all of its messages
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(
        ("thread_id" = String, Path, description = "Thread ID")
    ),
    responses(
        (status = 204, description = "Thread deleted (or already gone)")
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_thread(&user_id, &thread_id).await?;
    tracing::info!(thread_id = %thread_id, "Thread deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Owner-scoped lookup. Foreign threads read as missing.
pub(crate) async fn find_thread(state: &AppState, user_id: &str, thread_id: &str) -> ApiResult<Thread> {
    state
        .store
        .get_thread(user_id, thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Thread not found: {}", thread_id)))
}

pub(crate) fn thread_to_response(thread: Thread) -> ThreadResponse {
    ThreadResponse {
        thread_id: thread.id,
        title: thread.title,
        system_prompt: thread.system_prompt,
        created_at: thread.created_at,
        updated_at: thread.updated_at,
    }
}
