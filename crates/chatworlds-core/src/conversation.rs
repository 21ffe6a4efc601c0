use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use chatworlds_llm::ApiKey;
use chatworlds_persist::{
    CustomModel, CustomModelInput, CustomModelStore, Message, MessageStore, NewThread, Thread,
    ThreadPatch, ThreadStore,
};
use chatworlds_types::{ConversationConfig, Notice, SessionEvent, DEFAULT_THREAD_TITLE};

use crate::catalog::{ModelCatalog, ModelInfo};
use crate::error::{ConversationError, Result};
use crate::settings::CredentialSettings;
use crate::turn::{SendOutcome, TurnObserver, TurnRunner};

#[derive(Default)]
struct SessionState {
    user_id: Option<String>,
    /// Most recently updated first
    threads: Vec<Thread>,
    current_thread_id: Option<String>,
    /// Messages of the current thread, oldest first
    messages: Vec<Message>,
    selected_model: String,
    custom_models: Vec<CustomModel>,
}

impl SessionState {
    fn current_thread(&self) -> Option<&Thread> {
        let id = self.current_thread_id.as_deref()?;
        self.threads.iter().find(|t| t.id == id)
    }

    fn upsert_thread(&mut self, thread: &Thread) {
        match self.threads.iter_mut().find(|t| t.id == thread.id) {
            Some(existing) => *existing = thread.clone(),
            None => self.threads.push(thread.clone()),
        }
        self.threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    fn remove_thread(&mut self, thread_id: &str) -> bool {
        self.threads.retain(|t| t.id != thread_id);
        if self.current_thread_id.as_deref() == Some(thread_id) {
            self.current_thread_id = None;
            self.messages.clear();
            return true;
        }
        false
    }
}

/// Everything a presentation layer needs to render the session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub user_id: Option<String>,
    pub threads: Vec<Thread>,
    pub current_thread_id: Option<String>,
    pub messages: Vec<Message>,
    pub selected_model: String,
    pub custom_models: Vec<CustomModel>,
    pub models: Vec<ModelInfo>,
    /// A send is pending for the current thread (or for a thread still being created)
    pub is_loading: bool,
}

/// One signed-in user's conversation session.
///
/// Holds the thread list, the current selection and its messages, and the
/// selected model. Sends on different threads can overlap; a second send on
/// a thread with one in flight is rejected with `Busy`.
pub struct Conversation {
    runner: TurnRunner,
    settings: CredentialSettings,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Conversation {
    pub(crate) fn new(runner: TurnRunner) -> Self {
        let (events, _) = broadcast::channel(runner.config().event_capacity.max(1));
        let settings = CredentialSettings::new(Arc::clone(runner.store()));
        let state = SessionState {
            selected_model: runner.config().default_model.clone(),
            ..SessionState::default()
        };

        Self {
            runner,
            settings,
            state: Mutex::new(state),
            events,
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::ConversationBuilder {
        crate::builder::ConversationBuilder::new()
    }

    pub fn config(&self) -> &ConversationConfig {
        self.runner.config()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn notice(&self, notice: Notice) {
        self.emit(SessionEvent::Notice(notice));
    }

    async fn owner(&self) -> Result<String> {
        self.state
            .lock()
            .await
            .user_id
            .clone()
            .ok_or(ConversationError::AuthRequired)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        let is_loading = match &state.user_id {
            Some(owner) => self
                .runner
                .is_sending(owner, state.current_thread_id.as_deref()),
            None => false,
        };

        SessionSnapshot {
            user_id: state.user_id.clone(),
            threads: state.threads.clone(),
            current_thread_id: state.current_thread_id.clone(),
            messages: state.messages.clone(),
            selected_model: state.selected_model.clone(),
            custom_models: state.custom_models.clone(),
            models: ModelCatalog::with_custom(&state.custom_models).into_models(),
            is_loading,
        }
    }

    /// Whether a send is pending for `thread_id`, or for a thread being created when `None`
    pub async fn is_loading(&self, thread_id: Option<&str>) -> bool {
        match self.state.lock().await.user_id.as_deref() {
            Some(owner) => self.runner.is_sending(owner, thread_id),
            None => false,
        }
    }

    // ---- session lifecycle ----

    /// Start a session for `user_id` and load their threads and custom models
    pub async fn sign_in(&self, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(ConversationError::AuthRequired);
        }

        {
            let mut state = self.state.lock().await;
            *state = SessionState {
                user_id: Some(user_id.to_string()),
                selected_model: self.config().default_model.clone(),
                ..SessionState::default()
            };
        }
        info!(user_id = %user_id, "Session started");
        self.emit(SessionEvent::SignedIn {
            user_id: user_id.to_string(),
        });

        self.refresh_threads().await?;
        self.refresh_custom_models().await?;
        Ok(())
    }

    /// Drop every piece of in-memory session state
    pub async fn sign_out(&self) {
        let mut state = self.state.lock().await;
        *state = SessionState {
            selected_model: self.config().default_model.clone(),
            ..SessionState::default()
        };
        drop(state);

        info!("Session ended");
        self.emit(SessionEvent::SignedOut);
    }

    pub async fn refresh_threads(&self) -> Result<Vec<Thread>> {
        let owner = self.owner().await?;
        let threads = match self.runner.store().list_threads(&owner).await {
            Ok(threads) => threads,
            Err(e) => {
                error!(error = %e, "Failed to load threads");
                self.notice(Notice::error("Failed to load conversations"));
                return Err(e.into());
            }
        };

        let cleared = {
            let mut state = self.state.lock().await;
            state.threads = threads.clone();
            let orphaned = state
                .current_thread_id
                .as_deref()
                .is_some_and(|id| !threads.iter().any(|t| t.id == id));
            if orphaned {
                state.current_thread_id = None;
                state.messages.clear();
            }
            orphaned
        };

        self.emit(SessionEvent::ThreadsChanged);
        if cleared {
            self.emit(SessionEvent::CurrentThreadChanged { thread_id: None });
        }
        Ok(threads)
    }

    // ---- threads ----

    pub async fn select_thread(&self, thread_id: &str) -> Result<()> {
        let owner = self.owner().await?;
        let known = self.state.lock().await.threads.iter().any(|t| t.id == thread_id);
        if !known {
            match self.runner.store().get_thread(&owner, thread_id).await? {
                Some(thread) => self.state.lock().await.upsert_thread(&thread),
                None => return Err(ConversationError::NotFound(format!("thread {}", thread_id))),
            }
        }

        let messages = match self.runner.store().list_messages(&owner, thread_id).await {
            Ok(messages) => messages,
            Err(e) => {
                error!(thread_id = %thread_id, error = %e, "Failed to load messages");
                self.notice(Notice::error("Failed to load messages"));
                return Err(e.into());
            }
        };

        {
            let mut state = self.state.lock().await;
            state.current_thread_id = Some(thread_id.to_string());
            state.messages = messages;
        }
        debug!(thread_id = %thread_id, "Selected thread");
        self.emit(SessionEvent::CurrentThreadChanged {
            thread_id: Some(thread_id.to_string()),
        });
        self.emit(SessionEvent::MessagesChanged {
            thread_id: thread_id.to_string(),
        });
        Ok(())
    }

    /// Clear the selection so the next send starts a new thread
    pub async fn new_thread(&self) {
        {
            let mut state = self.state.lock().await;
            state.current_thread_id = None;
            state.messages.clear();
        }
        self.emit(SessionEvent::CurrentThreadChanged { thread_id: None });
    }

    /// Create an empty thread and make it current
    pub async fn create_thread(&self, title: Option<&str>) -> Result<Thread> {
        let owner = self.owner().await?;
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_THREAD_TITLE);
        let new_thread =
            NewThread::new(title).with_system_prompt(self.config().default_system_prompt.clone());

        let thread = match self.runner.store().create_thread(&owner, new_thread).await {
            Ok(thread) => thread,
            Err(e) => {
                error!(error = %e, "Failed to create thread");
                self.notice(Notice::error("Failed to create conversation"));
                return Err(e.into());
            }
        };

        {
            let mut state = self.state.lock().await;
            state.threads.insert(0, thread.clone());
            state.current_thread_id = Some(thread.id.clone());
            state.messages.clear();
        }
        self.emit(SessionEvent::ThreadsChanged);
        self.emit(SessionEvent::CurrentThreadChanged {
            thread_id: Some(thread.id.clone()),
        });
        Ok(thread)
    }

    /// Rename a thread. A blank title is ignored and returns `None`.
    pub async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<Option<Thread>> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(None);
        }
        let owner = self.owner().await?;

        let thread = match self
            .runner
            .store()
            .update_thread(&owner, thread_id, ThreadPatch::title(title))
            .await
        {
            Ok(thread) => thread,
            Err(e) => {
                error!(thread_id = %thread_id, error = %e, "Failed to rename thread");
                self.notice(Notice::error("Failed to update conversation"));
                return Err(e.into());
            }
        };

        self.state.lock().await.upsert_thread(&thread);
        self.emit(SessionEvent::ThreadsChanged);
        Ok(Some(thread))
    }

    /// Delete a thread with its messages, clearing the selection if it was current
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let owner = self.owner().await?;
        if let Err(e) = self.runner.store().delete_thread(&owner, thread_id).await {
            error!(thread_id = %thread_id, error = %e, "Failed to delete thread");
            self.notice(Notice::error("Failed to delete conversation"));
            return Err(e.into());
        }

        let cleared = self.state.lock().await.remove_thread(thread_id);
        info!(thread_id = %thread_id, "Deleted thread");
        self.emit(SessionEvent::ThreadsChanged);
        if cleared {
            self.emit(SessionEvent::CurrentThreadChanged { thread_id: None });
        }
        self.notice(Notice::success("Conversation deleted"));
        Ok(())
    }

    // ---- models ----

    pub async fn select_model(&self, model_id: &str) {
        self.state.lock().await.selected_model = model_id.to_string();
    }

    pub async fn selected_model(&self) -> String {
        self.state.lock().await.selected_model.clone()
    }

    /// Built-in catalog merged with the session's custom models
    pub async fn models(&self) -> Vec<ModelInfo> {
        let state = self.state.lock().await;
        ModelCatalog::with_custom(&state.custom_models).into_models()
    }

    pub async fn refresh_custom_models(&self) -> Result<Vec<CustomModel>> {
        let owner = self.owner().await?;
        let models = match self.runner.store().list_custom_models(&owner).await {
            Ok(models) => models,
            Err(e) => {
                error!(error = %e, "Failed to load custom models");
                self.notice(Notice::error("Failed to load custom models"));
                return Err(e.into());
            }
        };

        self.state.lock().await.custom_models = models.clone();
        self.emit(SessionEvent::CustomModelsChanged);
        Ok(models)
    }

    pub async fn add_custom_model(&self, input: CustomModelInput) -> Result<CustomModel> {
        let owner = match self.owner().await {
            Ok(owner) => owner,
            Err(e) => {
                self.notice(Notice::error("You must be logged in to add custom models"));
                return Err(e);
            }
        };
        let input = self.validated(input)?;

        match self.runner.store().create_custom_model(&owner, input).await {
            Ok(model) => {
                self.state.lock().await.custom_models.insert(0, model.clone());
                self.emit(SessionEvent::CustomModelsChanged);
                self.notice(Notice::success("Custom model added successfully"));
                Ok(model)
            }
            Err(e) => {
                error!(error = %e, "Failed to add custom model");
                self.notice(Notice::error("Failed to add custom model"));
                Err(e.into())
            }
        }
    }

    pub async fn update_custom_model(&self, id: &str, input: CustomModelInput) -> Result<CustomModel> {
        let owner = match self.owner().await {
            Ok(owner) => owner,
            Err(e) => {
                self.notice(Notice::error("You must be logged in to update custom models"));
                return Err(e);
            }
        };
        let input = self.validated(input)?;

        match self.runner.store().update_custom_model(&owner, id, input).await {
            Ok(model) => {
                {
                    let mut state = self.state.lock().await;
                    if let Some(existing) = state.custom_models.iter_mut().find(|m| m.id == model.id) {
                        *existing = model.clone();
                    }
                }
                self.emit(SessionEvent::CustomModelsChanged);
                self.notice(Notice::success("Custom model updated successfully"));
                Ok(model)
            }
            Err(e) => {
                error!(custom_model_id = %id, error = %e, "Failed to update custom model");
                self.notice(Notice::error("Failed to update custom model"));
                Err(e.into())
            }
        }
    }

    pub async fn delete_custom_model(&self, id: &str) -> Result<()> {
        let owner = self.owner().await?;
        if let Err(e) = self.runner.store().delete_custom_model(&owner, id).await {
            error!(custom_model_id = %id, error = %e, "Failed to delete custom model");
            self.notice(Notice::error("Failed to delete custom model"));
            return Err(e.into());
        }

        self.state.lock().await.custom_models.retain(|m| m.id != id);
        self.emit(SessionEvent::CustomModelsChanged);
        self.notice(Notice::success("Custom model deleted"));
        Ok(())
    }

    fn validated(&self, input: CustomModelInput) -> Result<CustomModelInput> {
        let input = validate_custom_model(input);
        if input.is_err() {
            self.notice(Notice::error("Please fill in all required fields."));
        }
        input
    }

    // ---- credential ----

    pub async fn save_api_key(&self, api_key: impl Into<ApiKey>) -> Result<()> {
        let owner = self.owner().await?;
        self.settings.save_api_key(&owner, api_key).await
    }

    pub async fn masked_api_key(&self) -> Result<Option<String>> {
        let owner = self.owner().await?;
        self.settings.masked_api_key(&owner).await
    }

    pub async fn has_credential(&self) -> Result<bool> {
        let owner = self.owner().await?;
        self.settings.has_credential(&owner).await
    }

    // ---- sending ----

    /// Send `content` to the current thread, creating one when nothing is selected
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome> {
        if content.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (owner, current, thread, model_id) = {
            let state = self.state.lock().await;
            let owner = state
                .user_id
                .clone()
                .ok_or(ConversationError::AuthRequired)?;
            (
                owner,
                state.current_thread_id.clone(),
                state.current_thread().cloned(),
                state.selected_model.clone(),
            )
        };

        let thread = match (current, thread) {
            (Some(id), None) => match self.runner.store().get_thread(&owner, &id).await? {
                Some(thread) => Some(thread),
                None => {
                    warn!(thread_id = %id, "Current thread no longer exists");
                    return Err(ConversationError::NotFound(format!("thread {}", id)));
                }
            },
            (_, thread) => thread,
        };

        let observer = SessionObserver {
            session: self,
            owner: &owner,
        };
        self.runner
            .send(&owner, thread, content, &model_id, &observer)
            .await
    }
}

/// Trim every field and require name, model id and provider
pub fn validate_custom_model(input: CustomModelInput) -> Result<CustomModelInput> {
    let input = CustomModelInput {
        name: input.name.trim().to_string(),
        model_id: input.model_id.trim().to_string(),
        provider: input.provider.trim().to_string(),
        description: input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    };

    if input.name.is_empty() || input.model_id.is_empty() || input.provider.is_empty() {
        return Err(ConversationError::InvalidInput(
            "name, model_id and provider are required".to_string(),
        ));
    }
    Ok(input)
}

/// Mirrors turn progress into the session state and event stream.
///
/// Writes are dropped once the session no longer belongs to `owner`.
struct SessionObserver<'a> {
    session: &'a Conversation,
    owner: &'a str,
}

impl SessionObserver<'_> {
    fn owns(&self, state: &SessionState) -> bool {
        state.user_id.as_deref() == Some(self.owner)
    }
}

#[async_trait]
impl TurnObserver for SessionObserver<'_> {
    async fn on_loading(&self, thread_id: Option<&str>, loading: bool) {
        self.session.emit(SessionEvent::LoadingChanged {
            thread_id: thread_id.map(str::to_string),
            loading,
        });
    }

    async fn on_thread_created(&self, thread: &Thread) {
        let became_current = {
            let mut state = self.session.state.lock().await;
            if !self.owns(&state) {
                return;
            }
            state.threads.insert(0, thread.clone());
            if state.current_thread_id.is_none() {
                state.current_thread_id = Some(thread.id.clone());
                state.messages.clear();
                true
            } else {
                false
            }
        };

        self.session.emit(SessionEvent::ThreadsChanged);
        if became_current {
            self.session.emit(SessionEvent::CurrentThreadChanged {
                thread_id: Some(thread.id.clone()),
            });
        }
    }

    async fn on_thread_discarded(&self, thread_id: &str) {
        let cleared = {
            let mut state = self.session.state.lock().await;
            if !self.owns(&state) {
                return;
            }
            state.remove_thread(thread_id)
        };
        self.session.emit(SessionEvent::ThreadsChanged);
        if cleared {
            self.session
                .emit(SessionEvent::CurrentThreadChanged { thread_id: None });
        }
    }

    async fn on_message(&self, message: &Message) {
        let visible = {
            let mut state = self.session.state.lock().await;
            if !self.owns(&state) {
                return;
            }
            let visible = state.current_thread_id.as_deref() == Some(message.thread_id.as_str());
            if visible {
                state.messages.push(message.clone());
            }
            visible
        };

        if visible {
            self.session.emit(SessionEvent::MessagesChanged {
                thread_id: message.thread_id.clone(),
            });
        }
    }

    async fn on_thread_touched(&self, thread: &Thread) {
        {
            let mut state = self.session.state.lock().await;
            if !self.owns(&state) {
                return;
            }
            state.upsert_thread(thread);
        }
        self.session.emit(SessionEvent::ThreadsChanged);
    }

    async fn on_notice(&self, notice: Notice) {
        self.session.notice(notice);
    }
}
