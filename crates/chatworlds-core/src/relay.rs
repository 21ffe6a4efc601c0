use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use chatworlds_llm::{
    ChatMessage, Completion, CompletionClient, CompletionOptions, CompletionRequest, ModelRelay,
    RelayError,
};
use chatworlds_persist::{CredentialStore, Store};

/// `ModelRelay` that looks up the owner's stored key before every call.
///
/// The credential is read once per call. A missing or blank key fails with
/// `MissingCredential` without touching the network.
pub struct CredentialRelay<C> {
    client: C,
    store: Arc<dyn Store>,
    options: CompletionOptions,
}

impl<C: CompletionClient> CredentialRelay<C> {
    pub fn new(client: C, store: Arc<dyn Store>) -> Self {
        Self {
            client,
            store,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl<C: CompletionClient> ModelRelay for CredentialRelay<C> {
    async fn complete(
        &self,
        owner: &str,
        history: Vec<ChatMessage>,
        model_id: &str,
    ) -> chatworlds_llm::error::Result<Completion> {
        if owner.trim().is_empty() {
            return Err(RelayError::Unauthenticated);
        }
        if history.is_empty() {
            return Err(RelayError::InvalidRequest("Messages array is required".to_string()));
        }

        let credential = self
            .store
            .get_credential(owner)
            .await
            .map_err(|e| RelayError::CredentialLookup(e.to_string()))?;

        let api_key = match credential {
            Some(credential) if !credential.api_key.is_blank() => credential.api_key,
            _ => {
                warn!(owner = %owner, "No OpenRouter credential on file");
                return Err(RelayError::MissingCredential);
            }
        };

        debug!(model = %model_id, messages = history.len(), "Relaying completion request");
        let request = CompletionRequest::new(model_id, history).with_options(self.options);
        self.client.complete(&api_key, request).await
    }
}
