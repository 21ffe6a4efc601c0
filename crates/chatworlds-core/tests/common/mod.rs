#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use chatworlds_core::{Conversation, ConversationConfig};
use chatworlds_llm::{ApiKey, ChatMessage, Completion, ModelRelay, RelayError};
use chatworlds_persist::{
    Credential, CredentialStore, CustomModel, CustomModelInput, CustomModelStore, MemoryStore,
    Message, MessageRole, MessageStore, NewMessage, NewThread, PersistError, Thread, ThreadPatch,
    ThreadStore,
};

type PersistResult<T> = Result<T, PersistError>;

/// MemoryStore wrapper with switchable failures
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_create_thread: AtomicBool,
    pub fail_user_append: AtomicBool,
    pub fail_assistant_append: AtomicBool,
    pub fail_list_messages: AtomicBool,
    pub fail_update_thread: AtomicBool,
}

fn unavailable() -> PersistError {
    PersistError::Unavailable("connection reset".to_string())
}

fn check(flag: &AtomicBool) -> PersistResult<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(unavailable());
    }
    Ok(())
}

#[async_trait]
impl ThreadStore for FlakyStore {
    async fn list_threads(&self, owner: &str) -> PersistResult<Vec<Thread>> {
        self.inner.list_threads(owner).await
    }

    async fn create_thread(&self, owner: &str, thread: NewThread) -> PersistResult<Thread> {
        check(&self.fail_create_thread)?;
        self.inner.create_thread(owner, thread).await
    }

    async fn get_thread(&self, owner: &str, thread_id: &str) -> PersistResult<Option<Thread>> {
        self.inner.get_thread(owner, thread_id).await
    }

    async fn update_thread(
        &self,
        owner: &str,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> PersistResult<Thread> {
        check(&self.fail_update_thread)?;
        self.inner.update_thread(owner, thread_id, patch).await
    }

    async fn delete_thread(&self, owner: &str, thread_id: &str) -> PersistResult<()> {
        self.inner.delete_thread(owner, thread_id).await
    }
}

#[async_trait]
impl MessageStore for FlakyStore {
    async fn list_messages(&self, owner: &str, thread_id: &str) -> PersistResult<Vec<Message>> {
        check(&self.fail_list_messages)?;
        self.inner.list_messages(owner, thread_id).await
    }

    async fn append_message(&self, owner: &str, message: NewMessage) -> PersistResult<Message> {
        match message.role {
            MessageRole::User => check(&self.fail_user_append)?,
            MessageRole::Assistant => check(&self.fail_assistant_append)?,
        }
        self.inner.append_message(owner, message).await
    }
}

#[async_trait]
impl CustomModelStore for FlakyStore {
    async fn list_custom_models(&self, owner: &str) -> PersistResult<Vec<CustomModel>> {
        self.inner.list_custom_models(owner).await
    }

    async fn create_custom_model(
        &self,
        owner: &str,
        input: CustomModelInput,
    ) -> PersistResult<CustomModel> {
        self.inner.create_custom_model(owner, input).await
    }

    async fn update_custom_model(
        &self,
        owner: &str,
        model_id: &str,
        input: CustomModelInput,
    ) -> PersistResult<CustomModel> {
        self.inner.update_custom_model(owner, model_id, input).await
    }

    async fn delete_custom_model(&self, owner: &str, model_id: &str) -> PersistResult<()> {
        self.inner.delete_custom_model(owner, model_id).await
    }
}

#[async_trait]
impl CredentialStore for FlakyStore {
    async fn get_credential(&self, owner: &str) -> PersistResult<Option<Credential>> {
        self.inner.get_credential(owner).await
    }

    async fn upsert_credential(&self, owner: &str, api_key: ApiKey) -> PersistResult<Credential> {
        self.inner.upsert_credential(owner, api_key).await
    }
}

/// Relay returning a fixed result and recording every history it receives
pub struct ScriptedRelay {
    response: Result<Completion, RelayError>,
    pub calls: AtomicUsize,
    pub histories: Mutex<Vec<Vec<ChatMessage>>>,
    pub models: Mutex<Vec<String>>,
}

impl ScriptedRelay {
    pub fn replying(content: &str) -> Self {
        Self::with_response(Ok(Completion::text(content)))
    }

    pub fn failing(error: RelayError) -> Self {
        Self::with_response(Err(error))
    }

    fn with_response(response: Result<Completion, RelayError>) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_history(&self) -> Vec<ChatMessage> {
        self.histories.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ModelRelay for ScriptedRelay {
    async fn complete(
        &self,
        _owner: &str,
        history: Vec<ChatMessage>,
        model_id: &str,
    ) -> Result<Completion, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(history);
        self.models.lock().unwrap().push(model_id.to_string());
        self.response.clone()
    }
}

/// Relay that blocks until released, to hold a send in flight
#[derive(Default)]
pub struct GatedRelay {
    pub started: Notify,
    pub release: Notify,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ModelRelay for GatedRelay {
    async fn complete(
        &self,
        _owner: &str,
        history: Vec<ChatMessage>,
        _model_id: &str,
    ) -> Result<Completion, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        let last = history.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Completion::text(format!("echo: {}", last)))
    }
}

pub const USER: &str = "user-1";

pub async fn signed_in(store: Arc<FlakyStore>, relay: Arc<dyn ModelRelay>) -> Conversation {
    signed_in_with(store, relay, ConversationConfig::default()).await
}

pub async fn signed_in_with(
    store: Arc<FlakyStore>,
    relay: Arc<dyn ModelRelay>,
    config: ConversationConfig,
) -> Conversation {
    let conversation = Conversation::builder()
        .store(store)
        .relay(relay)
        .config(config)
        .build()
        .unwrap();
    conversation.sign_in(USER).await.unwrap();
    conversation
}

pub fn roles(messages: &[Message]) -> Vec<MessageRole> {
    messages.iter().map(|m| m.role).collect()
}
