use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use chatworlds_core::{Conversation, CredentialRelay, NoticeLevel, SendOutcome, SessionEvent};
use chatworlds_llm::{OpenRouterClient, RelayConfig};
use chatworlds_persist::{StoreBackend, StoreBuilder};

const HELP: &str = "\
Commands:
  /new             start a new conversation (created on first message)
  /list            list conversations
  /open <n>        open conversation n from /list
  /rename <title>  rename the current conversation
  /delete          delete the current conversation
  /models          list available models
  /model <id>      select a model
  /key <api-key>   save your OpenRouter API key
  /quit            exit
Anything else is sent as a message.";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("Chat Worlds - Terminal Chat");
    println!("===========================\n");

    let store = match std::env::var("MONGODB_URI") {
        Ok(uri) => {
            println!("Using MongoDB store");
            StoreBuilder::new()
                .backend(StoreBackend::Mongodb)
                .mongodb_uri(uri)
                .database(std::env::var("MONGODB_DATABASE").unwrap_or_else(|_| "chatworlds".into()))
                .build()
                .await?
        }
        Err(_) => {
            println!("Using in-memory store (set MONGODB_URI to persist)");
            StoreBuilder::new().build().await?
        }
    };

    let client = OpenRouterClient::new(RelayConfig::default())?;
    let relay = CredentialRelay::new(client, Arc::clone(&store));

    let conversation = Conversation::builder()
        .store(store)
        .relay(Arc::new(relay))
        .build()?;

    let user = std::env::var("CHATWORLDS_USER").unwrap_or_else(|_| "local-user".to_string());
    conversation.sign_in(&user).await?;

    if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
        conversation.save_api_key(key).await?;
    }
    match conversation.masked_api_key().await? {
        Some(masked) => println!("Signed in as {} (API key {})", user, masked),
        None => println!("Signed in as {} (no API key yet, use /key)", user),
    }
    println!("Model: {}\n", conversation.selected_model().await);
    println!("{}\n", HELP);

    // Notices arrive on the event stream
    let mut events = conversation.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SessionEvent::Notice(notice) = event {
                let marker = match notice.level {
                    NoticeLevel::Success => "✓",
                    NoticeLevel::Error => "✗",
                };
                println!("   {} {}", marker, notice.text);
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        let result = match command {
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}", HELP);
                Ok(())
            }
            "/new" => {
                conversation.new_thread().await;
                println!("   New conversation");
                Ok(())
            }
            "/list" => list_threads(&conversation).await,
            "/open" => open_thread(&conversation, arg).await,
            "/rename" => rename_current(&conversation, arg).await,
            "/delete" => delete_current(&conversation).await,
            "/models" => {
                for model in conversation.models().await {
                    let tag = if model.custom { " (custom)" } else { "" };
                    println!("   {:<32} {} - {}{}", model.id, model.name, model.provider, tag);
                }
                Ok(())
            }
            "/model" => {
                conversation.select_model(arg).await;
                println!("   Model: {}", arg);
                Ok(())
            }
            "/key" => conversation.save_api_key(arg).await.map_err(anyhow::Error::from),
            _ => send(&conversation, line).await,
        };

        if let Err(e) = result {
            println!("   error: {}", e);
        }
    }

    conversation.sign_out().await;
    Ok(())
}

async fn send(conversation: &Conversation, content: &str) -> Result<()> {
    match conversation.send_message(content).await? {
        SendOutcome::Ignored => {}
        SendOutcome::Completed(report) => {
            if report.created_thread {
                println!("   [{}]", report.thread.title);
            }
            println!("\n{}\n", report.assistant_message.content);
        }
    }
    Ok(())
}

async fn list_threads(conversation: &Conversation) -> Result<()> {
    let snapshot = conversation.snapshot().await;
    if snapshot.threads.is_empty() {
        println!("   No conversations yet");
    }
    for (idx, thread) in snapshot.threads.iter().enumerate() {
        let marker = if snapshot.current_thread_id.as_deref() == Some(thread.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("  {}{:>2}. {}", marker, idx + 1, thread.title);
    }
    Ok(())
}

async fn open_thread(conversation: &Conversation, arg: &str) -> Result<()> {
    let snapshot = conversation.snapshot().await;
    let thread = arg
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| snapshot.threads.get(idx))
        .ok_or_else(|| anyhow::anyhow!("no conversation {}", arg))?;

    conversation.select_thread(&thread.id).await?;
    for message in conversation.snapshot().await.messages {
        println!("  {:?}: {}", message.role, message.content);
    }
    Ok(())
}

async fn delete_current(conversation: &Conversation) -> Result<()> {
    let Some(thread_id) = conversation.snapshot().await.current_thread_id else {
        anyhow::bail!("no conversation selected");
    };
    conversation.delete_thread(&thread_id).await?;
    Ok(())
}

async fn rename_current(conversation: &Conversation, title: &str) -> Result<()> {
    let Some(thread_id) = conversation.snapshot().await.current_thread_id else {
        anyhow::bail!("no conversation selected");
    };
    if conversation.rename_thread(&thread_id, title).await?.is_none() {
        anyhow::bail!("title cannot be empty");
    }
    Ok(())
}
