//! HTTP client for an OpenAI-compatible chat-completions endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use postsync_core::{AppConfig, EnrichedContent, EnrichmentGateway};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::prompt::{build_prompt, parse_reply};

const TEMPERATURE: f64 = 0.3;

/// Enrichment gateway backed by a chat-completions API.
///
/// Each batch is sent as a single user message; the endpoint, model and
/// optional bearer key come from [`AppConfig`].
pub struct OpenAiGateway {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGateway {
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the underlying `reqwest::Client` cannot
    /// be constructed.
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("postsync/0.1 (metrics-sync)")
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            api_key: api_key.map(str::to_owned),
            model: model.to_owned(),
        })
    }

    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AiError> {
        Self::new(
            &config.ai_endpoint,
            config.ai_api_key.as_deref(),
            &config.ai_model,
            config.request_timeout_secs,
        )
    }

    /// Sends `prompt` and returns the first choice's message text (empty
    /// when the endpoint returned no choices).
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            stream: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|source| AiError::Deserialize {
                context: "chat completion",
                source,
            })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

impl EnrichmentGateway for OpenAiGateway {
    type Error = AiError;

    async fn enrich(
        &self,
        batch: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, EnrichedContent>, AiError> {
        if batch.is_empty() {
            return Ok(BTreeMap::new());
        }

        tracing::debug!(items = batch.len(), model = %self.model, "calling enrichment endpoint");
        let content = self.complete(&build_prompt(batch)).await?;
        let parsed = parse_reply(&content)?;

        if parsed.len() < batch.len() {
            tracing::warn!(
                requested = batch.len(),
                returned = parsed.len(),
                "enrichment reply is missing items"
            );
        }
        Ok(parsed)
    }
}
