#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use chatworlds_api::{auth::StaticTokens, build_router, config::Config, state::AppState};
use chatworlds_llm::{ChatMessage, Completion, ModelRelay};
use chatworlds_persist::MemoryStore;

pub const ALICE: &str = "alice";
pub const ALICE_TOKEN: &str = "token-alice";
pub const BOB: &str = "bob";
pub const BOB_TOKEN: &str = "token-bob";

const TEST_CONFIG: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0

    [cors]
    enabled = true
    origins = ["*"]

    [logging]
    level = "debug"
    format = "pretty"
"#;

pub fn test_config() -> Config {
    toml::from_str(TEST_CONFIG).expect("test config parses")
}

/// Replies "echo: <last user turn>" and records every history it was given
#[derive(Default)]
pub struct EchoRelay {
    pub calls: Mutex<Vec<(String, Vec<ChatMessage>, String)>>,
}

impl EchoRelay {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_history(&self) -> Vec<ChatMessage> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, history, _)| history.clone())
            .unwrap_or_default()
    }

    pub fn last_model(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|(_, _, model)| model.clone())
    }
}

#[async_trait]
impl ModelRelay for EchoRelay {
    async fn complete(
        &self,
        owner: &str,
        history: Vec<ChatMessage>,
        model_id: &str,
    ) -> chatworlds_llm::error::Result<Completion> {
        let last = history.last().map(|m| m.content.clone()).unwrap_or_default();
        self.calls
            .lock()
            .unwrap()
            .push((owner.to_string(), history, model_id.to_string()));
        Ok(Completion {
            content: format!("echo: {}", last),
            model: Some(model_id.to_string()),
            usage: None,
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn test_app(relay: Arc<dyn ModelRelay>) -> TestApp {
    test_app_with_store(Arc::new(MemoryStore::new()), relay)
}

pub fn test_app_with_store(store: Arc<MemoryStore>, relay: Arc<dyn ModelRelay>) -> TestApp {
    let auth = StaticTokens::default()
        .with_token(ALICE_TOKEN, ALICE)
        .with_token(BOB_TOKEN, BOB);

    let state = AppState::new(test_config(), store.clone(), relay, Arc::new(auth));

    TestApp {
        router: build_router(Arc::new(state)),
        store,
    }
}

impl TestApp {
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, Some(token), Some(body)).await
    }
}
