use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use mongodb::bson::{self, oid::ObjectId};
use mongodb::Client;
use tracing::{debug, warn};

use chatworlds_llm::ApiKey;

use crate::dbs::mongo::models::{MongoMessage, MongoThread};
use crate::dbs::mongo::repositories::{
    MongoCredentialRepository, MongoCustomModelRepository, MongoMessageRepository,
    MongoThreadRepository,
};
use crate::error::{require_owner, PersistError, Result};
use crate::models::{
    Credential, CustomModel, CustomModelInput, Message, NewMessage, NewThread, Thread, ThreadPatch,
};
use crate::traits::{CredentialStore, CustomModelStore, MessageStore, ThreadStore};

/// MongoDB-backed store holding threads, messages, custom models and credentials
pub struct MongoStore {
    threads: MongoThreadRepository,
    messages: MongoMessageRepository,
    custom_models: MongoCustomModelRepository,
    credentials: MongoCredentialRepository,
}

impl MongoStore {
    /// Connect to MongoDB and make sure the ordering indexes exist
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Unavailable(e.to_string()))?;

        let store = Self {
            threads: MongoThreadRepository::new(&client, database),
            messages: MongoMessageRepository::new(&client, database),
            custom_models: MongoCustomModelRepository::new(&client, database),
            credentials: MongoCredentialRepository::new(&client, database),
        };

        store.threads.ensure_indexes().await?;
        store.messages.ensure_indexes().await?;
        debug!(database = %database, "MongoDB store ready");

        Ok(store)
    }

    /// Resolve a thread the owner may touch
    async fn owned_thread(&self, owner: &str, thread_id: &str) -> Result<MongoThread> {
        let object_id = parse_id(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        let thread = self
            .threads
            .get_thread(object_id)
            .await?
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        if thread.owner != owner {
            return Err(PersistError::Unauthorized(format!(
                "thread {} belongs to another user",
                thread_id
            )));
        }
        Ok(thread)
    }
}

fn parse_id(id: &str) -> Option<ObjectId> {
    ObjectId::parse_str(id).ok()
}

/// BSON dates carry milliseconds, so strict ordering needs a millisecond step
fn monotonic_after(prev: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = bson::DateTime::now().to_chrono();
    match prev {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

#[async_trait]
impl ThreadStore for MongoStore {
    async fn list_threads(&self, owner: &str) -> Result<Vec<Thread>> {
        let owner = require_owner(owner)?;
        let threads = self.threads.list_threads(owner).await?;
        Ok(threads.into_iter().map(Thread::from).collect())
    }

    async fn create_thread(&self, owner: &str, thread: NewThread) -> Result<Thread> {
        let owner = require_owner(owner)?;
        let thread = self.threads.create_thread(owner, thread).await?;
        Ok(thread.into())
    }

    async fn get_thread(&self, owner: &str, thread_id: &str) -> Result<Option<Thread>> {
        let owner = require_owner(owner)?;
        let Some(object_id) = parse_id(thread_id) else {
            return Ok(None);
        };
        let thread = self.threads.get_thread(object_id).await?;
        Ok(thread.filter(|t| t.owner == owner).map(Thread::from))
    }

    async fn update_thread(&self, owner: &str, thread_id: &str, patch: ThreadPatch) -> Result<Thread> {
        let owner = require_owner(owner)?;
        let current = self.owned_thread(owner, thread_id).await?;
        let updated_at = monotonic_after(Some(current.updated_at));

        self.threads
            .update_thread(current.id, owner, &patch, updated_at)
            .await?
            .map(Thread::from)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    async fn delete_thread(&self, owner: &str, thread_id: &str) -> Result<()> {
        let owner = require_owner(owner)?;
        let thread = match self.owned_thread(owner, thread_id).await {
            Ok(thread) => thread,
            Err(PersistError::ThreadNotFound(_)) | Err(PersistError::Unauthorized(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        // Messages first, then the thread
        let removed = self.messages.delete_thread_messages(thread.id).await?;
        self.threads.delete_thread(thread.id, owner).await?;
        debug!(thread_id = %thread_id, messages = removed, "Deleted thread");
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MongoStore {
    async fn list_messages(&self, owner: &str, thread_id: &str) -> Result<Vec<Message>> {
        let owner = require_owner(owner)?;
        let thread = self.owned_thread(owner, thread_id).await?;
        let messages = self.messages.get_messages(thread.id).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn append_message(&self, owner: &str, message: NewMessage) -> Result<Message> {
        let owner = require_owner(owner)?;
        let thread = self.owned_thread(owner, &message.thread_id).await?;
        let latest = self.messages.latest_message(thread.id).await?;

        let document = MongoMessage {
            id: ObjectId::new(),
            thread_id: thread.id,
            owner: owner.to_string(),
            role: message.role,
            content: message.content,
            model_id: message.model_id,
            created_at: monotonic_after(latest.map(|m| m.created_at)),
        };
        self.messages.save_message(&document).await?;
        Ok(document.into())
    }
}

#[async_trait]
impl CustomModelStore for MongoStore {
    async fn list_custom_models(&self, owner: &str) -> Result<Vec<CustomModel>> {
        let owner = require_owner(owner)?;
        let models = self.custom_models.list(owner).await?;
        Ok(models.into_iter().map(CustomModel::from).collect())
    }

    async fn create_custom_model(&self, owner: &str, input: CustomModelInput) -> Result<CustomModel> {
        let owner = require_owner(owner)?;
        Ok(self.custom_models.create(owner, input).await?.into())
    }

    async fn update_custom_model(
        &self,
        owner: &str,
        model_id: &str,
        input: CustomModelInput,
    ) -> Result<CustomModel> {
        let owner = require_owner(owner)?;
        let object_id = parse_id(model_id)
            .ok_or_else(|| PersistError::CustomModelNotFound(model_id.to_string()))?;

        self.custom_models
            .update(object_id, owner, input)
            .await?
            .map(CustomModel::from)
            .ok_or_else(|| PersistError::CustomModelNotFound(model_id.to_string()))
    }

    async fn delete_custom_model(&self, owner: &str, model_id: &str) -> Result<()> {
        let owner = require_owner(owner)?;
        match parse_id(model_id) {
            Some(object_id) => self.custom_models.delete(object_id, owner).await,
            None => {
                warn!(model_id = %model_id, "Ignoring delete for malformed custom model id");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CredentialStore for MongoStore {
    async fn get_credential(&self, owner: &str) -> Result<Option<Credential>> {
        let owner = require_owner(owner)?;
        Ok(self.credentials.get(owner).await?.map(Credential::from))
    }

    async fn upsert_credential(&self, owner: &str, api_key: ApiKey) -> Result<Credential> {
        let owner = require_owner(owner)?;
        let stored = self.credentials.upsert(owner, api_key.expose()).await?;
        Ok(stored.into())
    }
}
