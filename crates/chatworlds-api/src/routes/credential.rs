use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatworlds_llm::ApiKey;

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Deserialize, ToSchema)]
pub struct SaveCredentialRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CredentialResponse {
    pub has_credential: bool,
    /// Never the full key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_api_key: Option<String>,
}

/// Whether the caller has an OpenRouter key on file
#[utoipa::path(
    get,
    path = "/credential",
    responses(
        (status = 200, description = "Credential status", body = CredentialResponse),
        (status = 401, description = "User not authenticated")
    ),
    tag = "credential"
)]
pub async fn get_credential(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<CredentialResponse>> {
    let masked_api_key = state.settings.masked_api_key(&user_id).await?;

    Ok(Json(CredentialResponse {
        has_credential: masked_api_key.is_some(),
        masked_api_key,
    }))
}

/// Insert or replace the caller's OpenRouter key
#[utoipa::path(
    put,
    path = "/credential",
    request_body = SaveCredentialRequest,
    responses(
        (status = 200, description = "Credential saved", body = CredentialResponse),
        (status = 401, description = "User not authenticated")
    ),
    tag = "credential"
)]
pub async fn save_credential(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SaveCredentialRequest>,
) -> ApiResult<Json<CredentialResponse>> {
    state
        .settings
        .save_api_key(&user_id, ApiKey::new(req.api_key))
        .await?;
    let masked_api_key = state.settings.masked_api_key(&user_id).await?;

    Ok(Json(CredentialResponse {
        has_credential: masked_api_key.is_some(),
        masked_api_key,
    }))
}
