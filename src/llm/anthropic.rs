//! Anthropic Messages API Provider.
//!
//! Implements `CompletionProvider` over HTTP. A cacheable system segment is sent
//! with an ephemeral `cache_control` marker so repeated fresh generations can
//! replay it at the cache-read rate.

use super::provider::{CompletionProvider, ModelMetadata, ProviderMode};
use super::types::{Completion, Prompt, SystemSegment, UsageStats};
use crate::error::InvocationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Live provider configuration and state.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    api_url: String,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, InvocationError> {
        if api_key.trim().is_empty() {
            return Err(InvocationError::MissingCredential);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model,
            max_tokens,
            api_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Point the provider at a different endpoint (proxies, test servers).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    async fn send(&self, prompt: &Prompt) -> Result<Completion, InvocationError> {
        let request = MessagesRequest::new(&self.model, self.max_tokens, prompt);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(InvocationError::Api {
                status: status.as_u16(),
                message: api_error_message(&error_text),
            });
        }

        let body = response.text().await?;
        parse_response(&body)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            id: self.model.clone(),
            mode: ProviderMode::Live,
        }
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Completion, InvocationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(InvocationError::Cancelled),
            result = self.send(prompt) => result,
        }
    }
}

/// Parse a success body into text plus usage.
fn parse_response(body: &str) -> Result<Completion, InvocationError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| InvocationError::MalformedResponse(e.to_string()))?;

    let text: String = response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(InvocationError::MalformedResponse(
            "response contained no text content".to_string(),
        ));
    }

    Ok(Completion {
        text,
        usage: response.usage.into(),
    })
}

/// Pull the human-readable message out of an error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

// -----------------------------------------------------------------------------
// Messages API DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: Vec<SystemBlock>,
    messages: Vec<ApiMessage>,
}

impl MessagesRequest {
    fn new(model: &str, max_tokens: u32, prompt: &Prompt) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            system: vec![SystemBlock::from(&prompt.system)],
            messages: vec![ApiMessage {
                role: "user",
                content: prompt.user.clone(),
            }],
        }
    }
}

#[derive(Serialize)]
struct SystemBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

impl From<&SystemSegment> for SystemBlock {
    fn from(segment: &SystemSegment) -> Self {
        Self {
            kind: "text",
            text: segment.text.clone(),
            cache_control: segment.cacheable.then_some(CacheControl { kind: "ephemeral" }),
        }
    }
}

#[derive(Serialize)]
struct CacheControl {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: ApiUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl From<ApiUsage> for UsageStats {
    fn from(u: ApiUsage) -> Self {
        UsageStats::new(
            u.input_tokens,
            u.output_tokens,
            u.cache_creation_input_tokens.unwrap_or(0),
            u.cache_read_input_tokens.unwrap_or(0),
        )
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
