use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PersistError, Result};
use crate::memory::MemoryStore;
use crate::traits::Store;

/// Which backend holds the records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Mongodb,
}

pub struct StoreBuilder {
    backend: StoreBackend,
    mongodb_uri: Option<String>,
    database: Option<String>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            backend: StoreBackend::Memory,
            mongodb_uri: None,
            database: None,
        }
    }

    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = Some(db.into());
        self
    }

    pub async fn build(self) -> Result<Arc<dyn Store>> {
        match self.backend {
            StoreBackend::Memory => {
                info!("Using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
            StoreBackend::Mongodb => self.build_mongo().await,
        }
    }

    #[cfg(feature = "mongodb")]
    async fn build_mongo(self) -> Result<Arc<dyn Store>> {
        let uri = self
            .mongodb_uri
            .ok_or_else(|| PersistError::Internal("mongodb_uri is required".to_string()))?;
        let database = self
            .database
            .ok_or_else(|| PersistError::Internal("database is required".to_string()))?;

        let store = crate::dbs::mongo::MongoStore::connect(&uri, &database).await?;
        info!(database = %database, "Using MongoDB store");
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "mongodb"))]
    async fn build_mongo(self) -> Result<Arc<dyn Store>> {
        Err(PersistError::Internal(
            "MongoDB backend requested but the `mongodb` feature is disabled".to_string(),
        ))
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
