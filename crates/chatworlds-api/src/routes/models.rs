use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use chatworlds_core::{validate_custom_model, ModelCatalog, ModelInfo, Tier};
use chatworlds_persist::{CustomModel, CustomModelInput, CustomModelStore};

use crate::{auth::AuthUser, error::ApiResult, state::AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModelResponse {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub description: String,
    /// "free", "premium" or "enterprise"; absent on custom entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    pub custom: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListModelsResponse {
    pub models: Vec<ModelResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomModelRequest {
    pub name: String,
    pub model_id: String,
    pub provider: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomModelResponse {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub provider: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListCustomModelsResponse {
    /// Newest first
    pub custom_models: Vec<CustomModelResponse>,
}

/// Built-in models followed by the caller's custom models
#[utoipa::path(
    get,
    path = "/models",
    responses(
        (status = 200, description = "Model catalog", body = ListModelsResponse),
        (status = 401, description = "User not authenticated")
    ),
    tag = "models"
)]
pub async fn list_models(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ListModelsResponse>> {
    let custom = state.store.list_custom_models(&user_id).await?;
    let catalog = ModelCatalog::with_custom(&custom);

    Ok(Json(ListModelsResponse {
        models: catalog.into_models().into_iter().map(model_to_response).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/custom-models",
    responses(
        (status = 200, description = "Custom models", body = ListCustomModelsResponse)
    ),
    tag = "models"
)]
pub async fn list_custom_models(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<ListCustomModelsResponse>> {
    let models = state.store.list_custom_models(&user_id).await?;

    Ok(Json(ListCustomModelsResponse {
        custom_models: models.into_iter().map(custom_model_to_response).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/custom-models",
    request_body = CustomModelRequest,
    responses(
        (status = 201, description = "Custom model added", body = CustomModelResponse),
        (status = 400, description = "Missing required fields")
    ),
    tag = "models"
)]
pub async fn create_custom_model(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CustomModelRequest>,
) -> ApiResult<(StatusCode, Json<CustomModelResponse>)> {
    let input = validate_custom_model(request_to_input(req))?;
    let model = state.store.create_custom_model(&user_id, input).await?;

    tracing::info!(custom_model_id = %model.id, model = %model.model_id, "Custom model added");
    Ok((StatusCode::CREATED, Json(custom_model_to_response(model))))
}

#[utoipa::path(
    put,
    path = "/custom-models/{id}",
    params(
        ("id" = String, Path, description = "Custom model ID")
    ),
    request_body = CustomModelRequest,
    responses(
        (status = 200, description = "Custom model updated", body = CustomModelResponse),
        (status = 400, description = "Missing required fields"),
        (status = 404, description = "Custom model not found")
    ),
    tag = "models"
)]
pub async fn update_custom_model(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<CustomModelRequest>,
) -> ApiResult<Json<CustomModelResponse>> {
    let input = validate_custom_model(request_to_input(req))?;
    let model = state.store.update_custom_model(&user_id, &id, input).await?;

    Ok(Json(custom_model_to_response(model)))
}

#[utoipa::path(
    delete,
    path = "/custom-models/{id}",
    params(
        ("id" = String, Path, description = "Custom model ID")
    ),
    responses(
        (status = 204, description = "Custom model deleted")
    ),
    tag = "models"
)]
pub async fn delete_custom_model(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_custom_model(&user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn request_to_input(req: CustomModelRequest) -> CustomModelInput {
    CustomModelInput {
        name: req.name,
        model_id: req.model_id,
        provider: req.provider,
        description: req.description,
    }
}

fn model_to_response(model: ModelInfo) -> ModelResponse {
    let tier = model.tier.map(|tier| {
        match tier {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Enterprise => "enterprise",
        }
        .to_string()
    });

    ModelResponse {
        id: model.id,
        name: model.name,
        provider: model.provider,
        description: model.description,
        tier,
        custom: model.custom,
    }
}

fn custom_model_to_response(model: CustomModel) -> CustomModelResponse {
    CustomModelResponse {
        id: model.id,
        name: model.name,
        model_id: model.model_id,
        provider: model.provider,
        description: model.description,
        created_at: model.created_at,
    }
}
