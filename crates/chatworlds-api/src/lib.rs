pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, LoggingConfig};
use crate::middleware::logging;
use crate::routes::{credential, health, messages, models, relay, threads};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        threads::create_thread,
        threads::list_threads,
        threads::get_thread,
        threads::rename_thread,
        threads::delete_thread,
        messages::list_messages,
        messages::send_message,
        messages::send_thread_message,
        models::list_models,
        models::list_custom_models,
        models::create_custom_model,
        models::update_custom_model,
        models::delete_custom_model,
        credential::get_credential,
        credential::save_credential,
        relay::relay_chat,
    ),
    components(schemas(
        health::HealthResponse,
        threads::CreateThreadRequest,
        threads::RenameThreadRequest,
        threads::ThreadResponse,
        threads::ListThreadsResponse,
        messages::MessageResponse,
        messages::ListMessagesResponse,
        messages::SendMessageRequest,
        messages::ThreadMessageRequest,
        messages::RelayFailure,
        messages::SendMessageResponse,
        models::ModelResponse,
        models::ListModelsResponse,
        models::CustomModelRequest,
        models::CustomModelResponse,
        models::ListCustomModelsResponse,
        credential::SaveCredentialRequest,
        credential::CredentialResponse,
        relay::RelayChatRequest,
        relay::RelayChatResponse,
    )),
    tags(
        (name = "health"),
        (name = "threads"),
        (name = "messages"),
        (name = "models"),
        (name = "credential"),
        (name = "relay")
    )
)]
pub struct ApiDoc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Threads
        .route(
            "/threads",
            get(threads::list_threads).post(threads::create_thread),
        )
        .route(
            "/threads/:thread_id",
            get(threads::get_thread)
                .patch(threads::rename_thread)
                .delete(threads::delete_thread),
        )
        // Messages
        .route(
            "/threads/:thread_id/messages",
            get(messages::list_messages).post(messages::send_thread_message),
        )
        .route("/messages", post(messages::send_message))
        // Models
        .route("/models", get(models::list_models))
        .route(
            "/custom-models",
            get(models::list_custom_models).post(models::create_custom_model),
        )
        .route(
            "/custom-models/:id",
            put(models::update_custom_model).delete(models::delete_custom_model),
        )
        // Credential
        .route(
            "/credential",
            get(credential::get_credential).put(credential::save_credential),
        )
        // Relay function
        .route("/relay/chat", post(relay::relay_chat));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}

/// Install the global subscriber: `RUST_LOG` wins over the configured level
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
