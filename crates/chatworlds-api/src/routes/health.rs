use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use chatworlds_persist::{PersistError, ThreadStore};

use crate::state::AppState;

const PROBE_OWNER: &str = "_health_check";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Reports whether the store answers a lightweight query
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = HashMap::new();

    let store_ok = match check_store(&state).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Store health probe failed");
            false
        }
    };
    let backend = format!("{:?}", state.config.storage.backend).to_lowercase();
    services.insert(
        "store".to_string(),
        if store_ok { "connected" } else { "disconnected" }.to_string(),
    );
    services.insert("backend".to_string(), backend);

    Json(HealthResponse {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}

async fn check_store(state: &AppState) -> Result<(), PersistError> {
    state.store.list_threads(PROBE_OWNER).await.map(|_| ())
}
