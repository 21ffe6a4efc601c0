use std::sync::Arc;

use chatworlds_core::{CredentialSettings, TurnRunner};
use chatworlds_llm::ModelRelay;
use chatworlds_persist::Store;

use crate::auth::Authenticator;
use crate::config::Config;

/// Shared application state passed to all handlers
///
/// The turn runner is shared so concurrent sends to one thread are rejected
/// across requests, not just within one.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub relay: Arc<dyn ModelRelay>,
    pub runner: Arc<TurnRunner>,
    pub settings: CredentialSettings,
    pub auth: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        relay: Arc<dyn ModelRelay>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        let runner = TurnRunner::new(
            Arc::clone(&store),
            Arc::clone(&relay),
            config.conversation.clone(),
        );

        Self {
            config: Arc::new(config),
            settings: CredentialSettings::new(Arc::clone(&store)),
            store,
            relay,
            runner: Arc::new(runner),
            auth,
        }
    }
}
