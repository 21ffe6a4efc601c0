use std::sync::Arc;

use chatworlds_api::{
    auth::{Authenticator, StaticTokens},
    build_router,
    config::Config,
    init_logging,
    state::AppState,
};
use chatworlds_core::CredentialRelay;
use chatworlds_llm::{ModelRelay, OpenRouterClient};
use chatworlds_persist::StoreBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config.logging);

    tracing::info!("Starting Chat Worlds API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    tracing::info!(backend = ?config.storage.backend, "Initializing store");
    let store = StoreBuilder::new()
        .backend(config.storage.backend)
        .mongodb_uri(config.mongodb_uri.clone())
        .database(config.mongodb.database.clone())
        .build()
        .await?;

    tracing::info!(base_url = %config.relay.base_url, "Initializing OpenRouter client");
    let client = OpenRouterClient::new(config.relay.clone())?;
    let relay: Arc<dyn ModelRelay> = Arc::new(CredentialRelay::new(client, Arc::clone(&store)));

    if config.auth.tokens.is_empty() {
        tracing::warn!("No auth tokens configured; every request will be rejected");
    }
    let auth: Arc<dyn Authenticator> = Arc::new(StaticTokens::new(config.auth.tokens.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store, relay, auth));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
