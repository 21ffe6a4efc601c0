//! In-process store used by tests, the terminal example, and the API's
//! `memory` backend.

use async_trait::async_trait;
use chatworlds_llm::ApiKey;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::{require_owner, PersistError, Result};
use crate::models::{
    Credential, CustomModel, CustomModelInput, Message, NewMessage, NewThread, Thread, ThreadPatch,
};
use crate::traits::{CredentialStore, CustomModelStore, MessageStore, ThreadStore};

#[derive(Default)]
struct MemoryState {
    threads: HashMap<String, Thread>,
    /// Per thread, in append order
    messages: HashMap<String, Vec<Message>>,
    custom_models: HashMap<String, CustomModel>,
    credentials: HashMap<String, Credential>,
}

impl MemoryState {
    fn owned_thread(&self, owner: &str, thread_id: &str) -> Result<&Thread> {
        let thread = self
            .threads
            .get(thread_id)
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

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total messages across all threads
    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.values().map(Vec::len).sum()
    }

    pub async fn thread_count(&self) -> usize {
        self.state.read().await.threads.len()
    }
}

/// `now`, or one microsecond past `prev` when the clock has not moved on
fn monotonic_after(prev: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match prev {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl ThreadStore for MemoryStore {
    async fn list_threads(&self, owner: &str) -> Result<Vec<Thread>> {
        let owner = require_owner(owner)?;
        let state = self.state.read().await;
        let mut threads: Vec<Thread> = state
            .threads
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect();
        threads.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(threads)
    }

    async fn create_thread(&self, owner: &str, thread: NewThread) -> Result<Thread> {
        let owner = require_owner(owner)?;
        let now = Utc::now();
        let thread = Thread {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            title: thread.title,
            system_prompt: thread.system_prompt,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        state.messages.insert(thread.id.clone(), Vec::new());
        state.threads.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, owner: &str, thread_id: &str) -> Result<Option<Thread>> {
        let owner = require_owner(owner)?;
        let state = self.state.read().await;
        Ok(state
            .threads
            .get(thread_id)
            .filter(|t| t.owner == owner)
            .cloned())
    }

    async fn update_thread(&self, owner: &str, thread_id: &str, patch: ThreadPatch) -> Result<Thread> {
        let owner = require_owner(owner)?;
        let mut state = self.state.write().await;
        state.owned_thread(owner, thread_id)?;

        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        patch.apply(thread);
        thread.updated_at = monotonic_after(Some(thread.updated_at));
        Ok(thread.clone())
    }

    async fn delete_thread(&self, owner: &str, thread_id: &str) -> Result<()> {
        let owner = require_owner(owner)?;
        let mut state = self.state.write().await;
        let owned = state
            .threads
            .get(thread_id)
            .map(|t| t.owner == owner)
            .unwrap_or(false);
        if !owned {
            return Ok(());
        }

        state.messages.remove(thread_id);
        state.threads.remove(thread_id);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list_messages(&self, owner: &str, thread_id: &str) -> Result<Vec<Message>> {
        let owner = require_owner(owner)?;
        let state = self.state.read().await;
        state.owned_thread(owner, thread_id)?;

        let mut messages = state.messages.get(thread_id).cloned().unwrap_or_default();
        // Stable: equal timestamps keep append order
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn append_message(&self, owner: &str, message: NewMessage) -> Result<Message> {
        let owner = require_owner(owner)?;
        let mut state = self.state.write().await;
        state.owned_thread(owner, &message.thread_id)?;

        let log = state.messages.entry(message.thread_id.clone()).or_default();
        let created_at = monotonic_after(log.last().map(|m| m.created_at));
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: message.thread_id,
            role: message.role,
            content: message.content,
            model_id: message.model_id,
            created_at,
        };
        log.push(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl CustomModelStore for MemoryStore {
    async fn list_custom_models(&self, owner: &str) -> Result<Vec<CustomModel>> {
        let owner = require_owner(owner)?;
        let state = self.state.read().await;
        let mut models: Vec<CustomModel> = state
            .custom_models
            .values()
            .filter(|m| m.owner == owner)
            .cloned()
            .collect();
        models.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(models)
    }

    async fn create_custom_model(&self, owner: &str, input: CustomModelInput) -> Result<CustomModel> {
        let owner = require_owner(owner)?;
        let mut state = self.state.write().await;
        let latest = state
            .custom_models
            .values()
            .filter(|m| m.owner == owner)
            .map(|m| m.created_at)
            .max();
        let model = CustomModel {
            id: uuid::Uuid::new_v4().to_string(),
            owner: owner.to_string(),
            name: input.name,
            model_id: input.model_id,
            provider: input.provider,
            description: input.description,
            created_at: monotonic_after(latest),
        };
        state.custom_models.insert(model.id.clone(), model.clone());
        Ok(model)
    }

    async fn update_custom_model(
        &self,
        owner: &str,
        model_id: &str,
        input: CustomModelInput,
    ) -> Result<CustomModel> {
        let owner = require_owner(owner)?;
        let mut state = self.state.write().await;
        let model = state
            .custom_models
            .get_mut(model_id)
            .filter(|m| m.owner == owner)
            .ok_or_else(|| PersistError::CustomModelNotFound(model_id.to_string()))?;

        model.name = input.name;
        model.model_id = input.model_id;
        model.provider = input.provider;
        model.description = input.description;
        Ok(model.clone())
    }

    async fn delete_custom_model(&self, owner: &str, model_id: &str) -> Result<()> {
        let owner = require_owner(owner)?;
        let mut state = self.state.write().await;
        let owned = state
            .custom_models
            .get(model_id)
            .map(|m| m.owner == owner)
            .unwrap_or(false);
        if owned {
            state.custom_models.remove(model_id);
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_credential(&self, owner: &str) -> Result<Option<Credential>> {
        let owner = require_owner(owner)?;
        Ok(self.state.read().await.credentials.get(owner).cloned())
    }

    async fn upsert_credential(&self, owner: &str, api_key: ApiKey) -> Result<Credential> {
        let owner = require_owner(owner)?;
        let credential = Credential {
            owner: owner.to_string(),
            api_key,
            updated_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .credentials
            .insert(owner.to_string(), credential.clone());
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRole;

    const ALICE: &str = "alice";
    const BOB: &str = "bob";

    #[tokio::test]
    async fn test_threads_listed_by_recency() {
        let store = MemoryStore::new();
        let first = store.create_thread(ALICE, NewThread::new("First")).await.unwrap();
        let second = store.create_thread(ALICE, NewThread::new("Second")).await.unwrap();
        store.create_thread(BOB, NewThread::new("Bob's")).await.unwrap();

        store.update_thread(ALICE, &first.id, ThreadPatch::touch()).await.unwrap();

        let titles: Vec<String> = store
            .list_threads(ALICE)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_update_bumps_updated_at() {
        let store = MemoryStore::new();
        let thread = store.create_thread(ALICE, NewThread::new("Draft")).await.unwrap();

        let renamed = store
            .update_thread(ALICE, &thread.id, ThreadPatch::title("Final"))
            .await
            .unwrap();
        assert_eq!(renamed.title, "Final");
        assert!(renamed.updated_at > thread.updated_at);
        assert_eq!(renamed.created_at, thread.created_at);
    }

    #[tokio::test]
    async fn test_update_unknown_and_foreign_threads() {
        let store = MemoryStore::new();
        let thread = store.create_thread(ALICE, NewThread::new("Mine")).await.unwrap();

        let missing = store.update_thread(ALICE, "nope", ThreadPatch::touch()).await;
        assert_eq!(missing, Err(PersistError::ThreadNotFound("nope".to_string())));

        let foreign = store.update_thread(BOB, &thread.id, ThreadPatch::title("Stolen")).await;
        assert!(matches!(foreign, Err(PersistError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_empty_owner_is_unauthorized() {
        let store = MemoryStore::new();
        assert!(matches!(store.list_threads("").await, Err(PersistError::Unauthorized(_))));
        assert!(matches!(
            store.create_thread("  ", NewThread::new("x")).await,
            Err(PersistError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_is_idempotent() {
        let store = MemoryStore::new();
        let doomed = store.create_thread(ALICE, NewThread::new("Doomed")).await.unwrap();
        let kept = store.create_thread(ALICE, NewThread::new("Kept")).await.unwrap();
        store.append_message(ALICE, NewMessage::user(&doomed.id, "hi")).await.unwrap();
        store.append_message(ALICE, NewMessage::user(&kept.id, "hello")).await.unwrap();

        store.delete_thread(ALICE, &doomed.id).await.unwrap();
        store.delete_thread(ALICE, &doomed.id).await.unwrap();
        store.delete_thread(ALICE, "never-existed").await.unwrap();

        assert_eq!(store.message_count().await, 1);
        assert!(matches!(
            store.list_messages(ALICE, &doomed.id).await,
            Err(PersistError::ThreadNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_by_other_owner_keeps_thread() {
        let store = MemoryStore::new();
        let thread = store.create_thread(ALICE, NewThread::new("Mine")).await.unwrap();
        store.delete_thread(BOB, &thread.id).await.unwrap();
        assert!(store.get_thread(ALICE, &thread.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_messages_ordered_across_interleaved_threads() {
        let store = MemoryStore::new();
        let a = store.create_thread(ALICE, NewThread::new("A")).await.unwrap();
        let b = store.create_thread(ALICE, NewThread::new("B")).await.unwrap();

        for i in 0..5 {
            store
                .append_message(ALICE, NewMessage::user(&a.id, format!("a{}", i)))
                .await
                .unwrap();
            store
                .append_message(ALICE, NewMessage::assistant(&b.id, format!("b{}", i), "m"))
                .await
                .unwrap();
        }

        let messages = store.list_messages(ALICE, &a.id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a0", "a1", "a2", "a3", "a4"]);
        assert!(messages.windows(2).all(|w| w[0].created_at < w[1].created_at));

        let b_messages = store.list_messages(ALICE, &b.id).await.unwrap();
        assert!(b_messages.iter().all(|m| m.role == MessageRole::Assistant));
        assert!(b_messages.iter().all(|m| m.model_id.as_deref() == Some("m")));
    }

    #[tokio::test]
    async fn test_append_to_foreign_thread_is_unauthorized() {
        let store = MemoryStore::new();
        let thread = store.create_thread(ALICE, NewThread::new("Mine")).await.unwrap();
        let result = store.append_message(BOB, NewMessage::user(&thread.id, "sneaky")).await;
        assert!(matches!(result, Err(PersistError::Unauthorized(_))));
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_custom_models_crud() {
        let store = MemoryStore::new();
        let first = store
            .create_custom_model(ALICE, CustomModelInput::new("Mixtral", "mistralai/mixtral-8x7b-instruct", "Mistral"))
            .await
            .unwrap();
        let second = store
            .create_custom_model(ALICE, CustomModelInput::new("Qwen", "qwen/qwen-2-72b-instruct", "Qwen"))
            .await
            .unwrap();

        let listed = store.list_custom_models(ALICE).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);

        let updated = store
            .update_custom_model(
                ALICE,
                &first.id,
                CustomModelInput::new("Mixtral 8x22B", "mistralai/mixtral-8x22b-instruct", "Mistral")
                    .with_description("Bigger"),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Mixtral 8x22B");
        assert_eq!(updated.description.as_deref(), Some("Bigger"));

        let foreign = store
            .update_custom_model(BOB, &first.id, CustomModelInput::default())
            .await;
        assert!(matches!(foreign, Err(PersistError::CustomModelNotFound(_))));

        store.delete_custom_model(ALICE, &first.id).await.unwrap();
        assert_eq!(store.list_custom_models(ALICE).await.unwrap().len(), 1);
        assert!(store.list_custom_models(BOB).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_credential_upsert_replaces() {
        let store = MemoryStore::new();
        assert!(store.get_credential(ALICE).await.unwrap().is_none());

        store.upsert_credential(ALICE, ApiKey::new("sk-or-one")).await.unwrap();
        store.upsert_credential(ALICE, ApiKey::new("sk-or-two")).await.unwrap();

        let credential = store.get_credential(ALICE).await.unwrap().unwrap();
        assert_eq!(credential.api_key.expose(), "sk-or-two");
        assert!(store.get_credential(BOB).await.unwrap().is_none());
    }
}
