// OpenRouter chat completions client

use crate::config::RelayConfig;
use crate::error::{RelayError, Result, GENERIC_UPSTREAM_ERROR};
use crate::traits::{Completion, CompletionClient, CompletionRequest};
use crate::types::{ApiKey, ChatMessage};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenRouter client (HTTP direct, no SDK).
///
/// The API key is supplied per call because each user brings their own.
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("http-referer"),
            HeaderValue::from_str(&config.referer)
                .map_err(|e| RelayError::Config(format!("Invalid referer header: {}", e)))?,
        );
        headers.insert(
            HeaderName::from_static("x-title"),
            HeaderValue::from_str(&config.title)
                .map_err(|e| RelayError::Config(format!("Invalid title header: {}", e)))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_payload<'a>(&self, request: &'a CompletionRequest) -> OpenRouterRequest<'a> {
        OpenRouterRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenRouterClient {
    async fn complete(&self, api_key: &ApiKey, request: CompletionRequest) -> Result<Completion> {
        let payload = self.build_payload(&request);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending OpenRouter completion request"
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "OpenRouter API error");
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        parse_completion(&body)
    }
}

/// Pull `error.message` out of an upstream error body, falling back to a generic label
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| GENERIC_UPSTREAM_ERROR.to_string())
}

fn parse_completion(body: &str) -> Result<Completion> {
    let raw: OpenRouterChatResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!(error = %e, "Unparseable OpenRouter response");
        RelayError::InvalidUpstreamResponse
    })?;

    let content = raw
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| {
            tracing::error!("OpenRouter response missing choices[0].message.content");
            RelayError::InvalidUpstreamResponse
        })?;

    Ok(Completion {
        content,
        model: raw.model,
        usage: raw.usage,
    })
}

// ============================================================================
// OPENROUTER WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenRouterRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
