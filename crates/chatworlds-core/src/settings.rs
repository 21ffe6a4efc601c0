use std::sync::Arc;

use tracing::info;

use chatworlds_llm::ApiKey;
use chatworlds_persist::{CredentialStore, Store};

use crate::error::{ConversationError, Result};

/// Per-user OpenRouter key management. The stored key is only ever read back masked.
#[derive(Clone)]
pub struct CredentialSettings {
    store: Arc<dyn Store>,
}

impl CredentialSettings {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert or replace the owner's key. Surrounding whitespace is dropped.
    pub async fn save_api_key(&self, owner: &str, api_key: impl Into<ApiKey>) -> Result<()> {
        let owner = require_owner(owner)?;
        let api_key: ApiKey = api_key.into();
        let trimmed = ApiKey::new(api_key.expose().trim());

        self.store.upsert_credential(owner, trimmed).await?;
        info!(owner = %owner, "Saved OpenRouter API key");
        Ok(())
    }

    pub async fn masked_api_key(&self, owner: &str) -> Result<Option<String>> {
        let owner = require_owner(owner)?;
        let credential = self.store.get_credential(owner).await?;
        Ok(credential
            .filter(|c| !c.api_key.is_blank())
            .map(|c| c.api_key.masked()))
    }

    pub async fn has_credential(&self, owner: &str) -> Result<bool> {
        Ok(self.masked_api_key(owner).await?.is_some())
    }
}

fn require_owner(owner: &str) -> Result<&str> {
    if owner.trim().is_empty() {
        return Err(ConversationError::AuthRequired);
    }
    Ok(owner)
}
