use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use chatworlds_llm::{ChatMessage, ModelRelay, RelayError};
use chatworlds_persist::{
    Message, MessageStore, NewMessage, NewThread, Store, Thread, ThreadPatch, ThreadStore,
};
use chatworlds_types::{ConversationConfig, Notice};

use crate::error::{ConversationError, Result};
use crate::title::derive_title;

/// Hooks fired while a turn runs, in the order the records become durable.
///
/// Every method defaults to a no-op.
#[async_trait]
pub trait TurnObserver: Send + Sync {
    /// Sending flag flipped. `None` while the turn is still creating its thread.
    async fn on_loading(&self, _thread_id: Option<&str>, _loading: bool) {}

    async fn on_thread_created(&self, _thread: &Thread) {}

    /// An auto-created thread was removed again because its first message failed
    async fn on_thread_discarded(&self, _thread_id: &str) {}

    async fn on_message(&self, _message: &Message) {}

    async fn on_thread_touched(&self, _thread: &Thread) {}

    async fn on_notice(&self, _notice: Notice) {}
}

/// Observer for callers that only need the returned report
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// Content was empty after trimming
    Ignored,
    Completed(SendReport),
}

impl SendOutcome {
    pub fn report(&self) -> Option<&SendReport> {
        match self {
            Self::Ignored => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Records written by one completed turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendReport {
    pub thread: Thread,
    pub created_thread: bool,
    pub user_message: Message,
    /// The completion, or the failure reply when the relay failed
    pub assistant_message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relay_error: Option<RelayError>,
}

impl SendReport {
    pub fn relay_failed(&self) -> bool {
        self.relay_error.is_some()
    }
}

const PENDING_THREAD: &str = "<new>";

/// Owner-scoped set of threads with a send in progress
#[derive(Default)]
struct InFlight {
    keys: Mutex<HashSet<(String, String)>>,
}

impl InFlight {
    fn try_acquire(self: &Arc<Self>, owner: &str, thread: &str) -> Option<InFlightGuard> {
        let key = (owner.to_string(), thread.to_string());
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            registry: Arc::clone(self),
            key,
        })
    }

    fn contains(&self, owner: &str, thread: &str) -> bool {
        let keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        keys.contains(&(owner.to_string(), thread.to_string()))
    }
}

struct InFlightGuard {
    registry: Arc<InFlight>,
    key: (String, String),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut keys = self
            .registry
            .keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        keys.remove(&self.key);
    }
}

/// Runs the send pipeline: resolve thread, record the user turn, relay,
/// record the reply, bump the thread.
pub struct TurnRunner {
    store: Arc<dyn Store>,
    relay: Arc<dyn ModelRelay>,
    config: ConversationConfig,
    in_flight: Arc<InFlight>,
}

impl TurnRunner {
    pub fn new(store: Arc<dyn Store>, relay: Arc<dyn ModelRelay>, config: ConversationConfig) -> Self {
        Self {
            store,
            relay,
            config,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Whether a send is pending for `thread_id`, or for a new thread when `None`
    pub fn is_sending(&self, owner: &str, thread_id: Option<&str>) -> bool {
        self.in_flight
            .contains(owner, thread_id.unwrap_or(PENDING_THREAD))
    }

    /// Send `content` into `thread`, creating a thread first when `None`.
    ///
    /// Relay failures do not fail the call: they are recorded as the
    /// assistant reply and reported in [`SendReport::relay_error`].
    pub async fn send(
        &self,
        owner: &str,
        thread: Option<Thread>,
        content: &str,
        model_id: &str,
        observer: &dyn TurnObserver,
    ) -> Result<SendOutcome> {
        if content.trim().is_empty() {
            debug!("Ignoring empty message");
            return Ok(SendOutcome::Ignored);
        }
        if owner.trim().is_empty() {
            return Err(ConversationError::AuthRequired);
        }

        let thread_id = thread.as_ref().map(|t| t.id.clone());
        let guard = self
            .in_flight
            .try_acquire(owner, thread_id.as_deref().unwrap_or(PENDING_THREAD))
            .ok_or_else(|| ConversationError::Busy {
                thread_id: thread_id.clone(),
            })?;

        observer.on_loading(thread_id.as_deref(), true).await;
        let mut loading = thread_id;
        let result = self
            .run(owner, thread, content, model_id, observer, guard, &mut loading)
            .await;
        observer.on_loading(loading.as_deref(), false).await;
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        owner: &str,
        thread: Option<Thread>,
        content: &str,
        model_id: &str,
        observer: &dyn TurnObserver,
        guard: InFlightGuard,
        loading: &mut Option<String>,
    ) -> Result<SendOutcome> {
        let created_thread = thread.is_none();
        let (thread, _guard) = match thread {
            Some(thread) => (thread, guard),
            None => {
                let (thread, thread_guard) = self.create_thread(owner, content, observer).await?;
                drop(guard);
                observer.on_loading(None, false).await;
                observer.on_loading(Some(&thread.id), true).await;
                *loading = Some(thread.id.clone());
                (thread, thread_guard)
            }
        };

        let prior = if created_thread {
            Vec::new()
        } else {
            match self.store.list_messages(owner, &thread.id).await {
                Ok(messages) => messages,
                Err(e) => {
                    error!(thread_id = %thread.id, error = %e, "Failed to load history");
                    observer.on_notice(Notice::error("Failed to load messages")).await;
                    return Err(e.into());
                }
            }
        };

        let user_message = match self
            .store
            .append_message(owner, NewMessage::user(&thread.id, content))
            .await
        {
            Ok(message) => message,
            Err(e) => {
                error!(thread_id = %thread.id, error = %e, "Failed to save user message");
                if created_thread {
                    self.discard_thread(owner, &thread.id, observer).await;
                }
                observer.on_notice(Notice::error("Failed to save message")).await;
                return Err(e.into());
            }
        };
        observer.on_message(&user_message).await;

        let history = self.history(&thread, &prior, &user_message);
        let (reply, relay_error) = match self.relay.complete(owner, history, model_id).await {
            Ok(completion) => (completion.content, None),
            Err(e) => {
                warn!(thread_id = %thread.id, model = %model_id, code = e.code(), "Relay failed");
                observer.on_notice(Notice::error(e.to_string())).await;
                (self.config.failure_reply.clone(), Some(e))
            }
        };

        let assistant = self
            .store
            .append_message(owner, NewMessage::assistant(&thread.id, reply, model_id))
            .await;
        if let Ok(message) = &assistant {
            observer.on_message(message).await;
        }

        let thread = self.touch_thread(owner, thread, observer).await;

        let assistant_message = match assistant {
            Ok(message) => message,
            Err(e) => {
                error!(thread_id = %thread.id, error = %e, "Failed to save assistant message");
                observer.on_notice(Notice::error("Failed to save message")).await;
                return Err(e.into());
            }
        };

        info!(
            thread_id = %thread.id,
            model = %model_id,
            relay_failed = relay_error.is_some(),
            "Turn completed"
        );

        Ok(SendOutcome::Completed(SendReport {
            thread,
            created_thread,
            user_message,
            assistant_message,
            relay_error,
        }))
    }

    async fn create_thread(
        &self,
        owner: &str,
        content: &str,
        observer: &dyn TurnObserver,
    ) -> Result<(Thread, InFlightGuard)> {
        let new_thread = NewThread::new(derive_title(content))
            .with_system_prompt(self.config.default_system_prompt.clone());

        let thread = match self.store.create_thread(owner, new_thread).await {
            Ok(thread) => thread,
            Err(e) => {
                error!(error = %e, "Failed to create thread");
                observer
                    .on_notice(Notice::error("Failed to create conversation"))
                    .await;
                return Err(e.into());
            }
        };

        // The real id is claimed before the thread becomes visible to other senders
        let Some(guard) = self.in_flight.try_acquire(owner, &thread.id) else {
            warn!(thread_id = %thread.id, "New thread already claimed by another send");
            self.discard_thread(owner, &thread.id, observer).await;
            return Err(ConversationError::Busy {
                thread_id: Some(thread.id),
            });
        };

        debug!(thread_id = %thread.id, title = %thread.title, "Auto-created thread");
        observer.on_thread_created(&thread).await;
        Ok((thread, guard))
    }

    async fn discard_thread(&self, owner: &str, thread_id: &str, observer: &dyn TurnObserver) {
        match self.store.delete_thread(owner, thread_id).await {
            Ok(()) => debug!(thread_id = %thread_id, "Discarded empty thread"),
            Err(e) => warn!(thread_id = %thread_id, error = %e, "Failed to discard empty thread"),
        }
        observer.on_thread_discarded(thread_id).await;
    }

    async fn touch_thread(&self, owner: &str, thread: Thread, observer: &dyn TurnObserver) -> Thread {
        match self
            .store
            .update_thread(owner, &thread.id, ThreadPatch::touch())
            .await
        {
            Ok(updated) => {
                observer.on_thread_touched(&updated).await;
                updated
            }
            Err(e) => {
                warn!(thread_id = %thread.id, error = %e, "Failed to bump thread");
                thread
            }
        }
    }

    /// System prompt (when enabled and non-empty), prior turns, then the new user turn
    fn history(&self, thread: &Thread, prior: &[Message], user_message: &Message) -> Vec<ChatMessage> {
        let mut history = Vec::with_capacity(prior.len() + 2);

        if self.config.include_system_prompt {
            if let Some(prompt) = thread.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
                history.push(ChatMessage::system(prompt));
            }
        }

        history.extend(prior.iter().map(ChatMessage::from));
        history.push(ChatMessage::from(user_message));
        history
    }
}
