//! OpenAI-compatible HTTP chat completion backend

use super::{ChatMessage, Generator};
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

/// Generation gateway over an OpenAI-compatible `/v1/chat/completions`
/// endpoint
pub struct HttpGenerator {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    timeout: std::time::Duration,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl HttpGenerator {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base = Url::parse(&config.url)?;
        let endpoint = base
            .join("/v1/chat/completions")
            .map_err(|e| Error::Config(format!("Invalid LLM backend URL: {}", e)))?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        debug!(
            "Generating with model {} ({} messages, temperature {})",
            self.model,
            messages.len(),
            temperature
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            max_tokens,
            temperature,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::GenerationTimeout(self.timeout)
            } else {
                Error::Generation(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Error::RateLimited(format!(
                    "LLM backend returned 429 for model '{}'",
                    self.model
                )));
            }
            status if !status.is_success() => {
                let detail = response.text().await.unwrap_or_default();
                return Err(Error::Generation(format!(
                    "LLM backend returned {}: {}",
                    status, detail
                )));
            }
            _ => {}
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid completion response: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            info!(
                "LLM usage for {}: prompt {} + completion {} = {} tokens",
                self.model, usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::Generation("LLM returned no content".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
