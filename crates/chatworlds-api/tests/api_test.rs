mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use chatworlds_llm::Role;
use chatworlds_persist::{MessageStore, NewMessage, NewThread, ThreadStore};

use common::{test_app, EchoRelay, TestApp, ALICE, ALICE_TOKEN, BOB, BOB_TOKEN};

fn echo_app() -> (TestApp, Arc<EchoRelay>) {
    let relay = Arc::new(EchoRelay::default());
    (test_app(relay.clone()), relay)
}

#[tokio::test]
async fn test_health_reports_store() {
    let (app, _) = echo_app();

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["store"], "connected");
    assert_eq!(body["services"]["backend"], "memory");
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let (app, _) = echo_app();

    let (status, body) = app.call("GET", "/threads", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not authenticated");
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = app.get("/threads", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_message_creates_titled_thread() {
    let (app, relay) = echo_app();

    let (status, body) = app
        .post("/messages", ALICE_TOKEN, json!({"content": "Plan a trip to Lisbon"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["created_thread"], true);
    assert_eq!(body["thread"]["title"], "Plan a trip to Lisbon");
    assert_eq!(body["user_message"]["role"], "user");
    assert_eq!(body["assistant_message"]["content"], "echo: Plan a trip to Lisbon");
    assert_eq!(body["assistant_message"]["model_id"], "openai/gpt-4-turbo");
    assert!(body.get("relay_error").is_none());
    assert_eq!(relay.last_model().as_deref(), Some("openai/gpt-4-turbo"));

    let thread_id = body["thread"]["thread_id"].as_str().unwrap().to_string();
    let (_, listed) = app.get("/threads", ALICE_TOKEN).await;
    assert_eq!(listed["threads"].as_array().unwrap().len(), 1);

    let (status, messages) = app
        .get(&format!("/threads/{}/messages", thread_id), ALICE_TOKEN)
        .await;
    assert_eq!(status, StatusCode::OK);
    let messages = messages["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
}

#[tokio::test]
async fn test_send_into_existing_thread_relays_full_history() {
    let (app, relay) = echo_app();
    let thread = app
        .store
        .create_thread(ALICE, NewThread::new("Trip").with_system_prompt("Be brief."))
        .await
        .unwrap();
    app.store
        .append_message(ALICE, NewMessage::user(&thread.id, "Hi"))
        .await
        .unwrap();
    app.store
        .append_message(ALICE, NewMessage::assistant(&thread.id, "Hello", "openai/gpt-4-turbo"))
        .await
        .unwrap();

    let (status, body) = app
        .post(
            &format!("/threads/{}/messages", thread.id),
            ALICE_TOKEN,
            json!({"content": "Where to?", "model": "anthropic/claude-3-sonnet"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created_thread"], false);

    let history = relay.last_history();
    let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(history[0].content, "Be brief.");
    assert_eq!(history[3].content, "Where to?");
    assert_eq!(relay.last_model().as_deref(), Some("anthropic/claude-3-sonnet"));

    let messages = app.store.list_messages(ALICE, &thread.id).await.unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[3].model_id.as_deref(), Some("anthropic/claude-3-sonnet"));
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let (app, relay) = echo_app();

    let (status, body) = app
        .post("/messages", ALICE_TOKEN, json!({"content": "   "}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ignored");
    assert_eq!(relay.call_count(), 0);
    assert_eq!(app.store.thread_count().await, 0);
}

#[tokio::test]
async fn test_other_users_threads_are_invisible() {
    let (app, relay) = echo_app();
    let thread = app
        .store
        .create_thread(ALICE, NewThread::new("Private"))
        .await
        .unwrap();

    let (status, body) = app.get(&format!("/threads/{}", thread.id), BOB_TOKEN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = app
        .post(
            &format!("/threads/{}/messages", thread.id),
            BOB_TOKEN,
            json!({"content": "let me in"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(relay.call_count(), 0);

    let (_, listed) = app.get("/threads", BOB_TOKEN).await;
    assert!(listed["threads"].as_array().unwrap().is_empty());

    let (status, _) = app
        .call("DELETE", &format!("/threads/{}", thread.id), Some(BOB_TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.store.get_thread(ALICE, &thread.id).await.unwrap().is_some());
    assert!(app.store.list_threads(BOB).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rename_delete_thread() {
    let (app, _) = echo_app();

    let (status, created) = app.post("/threads", ALICE_TOKEN, json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "New Conversation");
    assert_eq!(created["system_prompt"], "You are a helpful assistant.");
    let thread_id = created["thread_id"].as_str().unwrap().to_string();
    let uri = format!("/threads/{}", thread_id);

    let (status, _) = app
        .call("PATCH", &uri, Some(ALICE_TOKEN), Some(json!({"title": "  "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, renamed) = app
        .call("PATCH", &uri, Some(ALICE_TOKEN), Some(json!({"title": "Recipes"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Recipes");
    assert_ne!(renamed["updated_at"], created["updated_at"]);

    let (status, _) = app.call("DELETE", &uri, Some(ALICE_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, ALICE_TOKEN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting again is not an error
    let (status, _) = app.call("DELETE", &uri, Some(ALICE_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_deleting_thread_removes_its_messages() {
    let (app, _) = echo_app();
    let (_, body) = app
        .post("/messages", ALICE_TOKEN, json!({"content": "Hello"}))
        .await;
    let thread_id = body["thread"]["thread_id"].as_str().unwrap().to_string();
    assert_eq!(app.store.message_count().await, 2);

    let (status, _) = app
        .call("DELETE", &format!("/threads/{}", thread_id), Some(ALICE_TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.store.message_count().await, 0);
}

#[tokio::test]
async fn test_custom_models_extend_catalog() {
    let (app, _) = echo_app();

    let (status, body) = app
        .post(
            "/custom-models",
            ALICE_TOKEN,
            json!({"name": "Mixtral", "model_id": "", "provider": "Mistral"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, created) = app
        .post(
            "/custom-models",
            ALICE_TOKEN,
            json!({
                "name": " Mixtral 8x7B ",
                "model_id": "mistralai/mixtral-8x7b-instruct",
                "provider": "Mistral",
                "description": "Sparse mixture of experts"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Mixtral 8x7B");
    let id = created["id"].as_str().unwrap().to_string();

    let (_, catalog) = app.get("/models", ALICE_TOKEN).await;
    let models = catalog["models"].as_array().unwrap();
    let custom = models
        .iter()
        .find(|m| m["id"] == "mistralai/mixtral-8x7b-instruct")
        .expect("custom entry listed");
    assert_eq!(custom["custom"], true);
    assert!(custom.get("tier").is_none());
    assert!(models.iter().any(|m| m["id"] == "openai/gpt-4-turbo" && m["tier"] == "premium"));

    let (_, bob_catalog) = app.get("/models", BOB_TOKEN).await;
    assert!(bob_catalog["models"]
        .as_array()
        .unwrap()
        .iter()
        .all(|m| m["custom"] == false));

    let (status, updated) = app
        .call(
            "PUT",
            &format!("/custom-models/{}", id),
            Some(ALICE_TOKEN),
            Some(json!({"name": "Mixtral", "model_id": "mistralai/mixtral-8x22b", "provider": "Mistral"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["model_id"], "mistralai/mixtral-8x22b");

    let (status, _) = app
        .call(
            "PUT",
            &format!("/custom-models/{}", id),
            Some(BOB_TOKEN),
            Some(json!({"name": "Mine", "model_id": "x/y", "provider": "Z"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call("DELETE", &format!("/custom-models/{}", id), Some(ALICE_TOKEN), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, listed) = app.get("/custom-models", ALICE_TOKEN).await;
    assert!(listed["custom_models"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_credential_is_only_returned_masked() {
    let (app, _) = echo_app();

    let (status, body) = app.get("/credential", ALICE_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_credential"], false);
    assert!(body.get("masked_api_key").is_none());

    let key = "sk-or-v1-0123456789abcdef";
    let (status, saved) = app
        .call("PUT", "/credential", Some(ALICE_TOKEN), Some(json!({"api_key": format!(" {} ", key)})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["has_credential"], true);
    let masked = saved["masked_api_key"].as_str().unwrap();
    assert!(masked.starts_with("sk-o"));
    assert!(masked.ends_with("cdef"));
    assert!(!masked.contains(key));

    let (_, body) = app.get("/credential", BOB_TOKEN).await;
    assert_eq!(body["has_credential"], false);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _) = echo_app();

    let (status, doc) = app.call("GET", "/api/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/relay/chat").is_some());
    assert!(doc["paths"].get("/threads/{thread_id}/messages").is_some());
}
