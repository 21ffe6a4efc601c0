use async_trait::async_trait;
use chatworlds_llm::ApiKey;

use crate::error::Result;
use crate::models::{
    Credential, CustomModel, CustomModelInput, Message, NewMessage, NewThread, Thread, ThreadPatch,
};

/// Conversation threads, scoped to the owning user
///
/// Every method takes the session owner explicitly; an empty owner fails
/// with `Unauthorized`.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Owner's threads, most recently updated first
    async fn list_threads(&self, owner: &str) -> Result<Vec<Thread>>;

    async fn create_thread(&self, owner: &str, thread: NewThread) -> Result<Thread>;

    /// `None` for unknown ids and for threads of other owners
    async fn get_thread(&self, owner: &str, thread_id: &str) -> Result<Option<Thread>>;

    /// Apply a patch and bump `updated_at`
    async fn update_thread(&self, owner: &str, thread_id: &str, patch: ThreadPatch) -> Result<Thread>;

    /// Delete a thread and all of its messages. Unknown ids are a no-op.
    async fn delete_thread(&self, owner: &str, thread_id: &str) -> Result<()>;
}

/// Append-only message log per thread
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Thread messages, oldest first
    async fn list_messages(&self, owner: &str, thread_id: &str) -> Result<Vec<Message>>;

    async fn append_message(&self, owner: &str, message: NewMessage) -> Result<Message>;
}

#[async_trait]
pub trait CustomModelStore: Send + Sync {
    /// Owner's custom models, newest first
    async fn list_custom_models(&self, owner: &str) -> Result<Vec<CustomModel>>;

    async fn create_custom_model(&self, owner: &str, input: CustomModelInput) -> Result<CustomModel>;

    async fn update_custom_model(
        &self,
        owner: &str,
        model_id: &str,
        input: CustomModelInput,
    ) -> Result<CustomModel>;

    async fn delete_custom_model(&self, owner: &str, model_id: &str) -> Result<()>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential(&self, owner: &str) -> Result<Option<Credential>>;

    /// Insert or replace the owner's key
    async fn upsert_credential(&self, owner: &str, api_key: ApiKey) -> Result<Credential>;
}

/// Convenience trait for backends that hold every record kind
pub trait Store: ThreadStore + MessageStore + CustomModelStore + CredentialStore {}

impl<T> Store for T where T: ThreadStore + MessageStore + CustomModelStore + CredentialStore {}
