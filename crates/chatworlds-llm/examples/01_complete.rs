use chatworlds_llm::{
    ApiKey, ChatMessage, CompletionClient, CompletionRequest, OpenRouterClient, RelayConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api_key = ApiKey::new(std::env::var("OPENROUTER_API_KEY")?);
    let client = OpenRouterClient::new(RelayConfig::default())?;

    let request = CompletionRequest::new(
        "openai/gpt-3.5-turbo",
        vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Say hello in three languages."),
        ],
    );

    let completion = client.complete(&api_key, request).await?;
    println!("{}", completion.content);

    Ok(())
}
