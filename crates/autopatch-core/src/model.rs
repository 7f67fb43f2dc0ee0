//! Language-model client boundary.
//!
//! The pipeline consumes the model through the [`ModelClient`] trait and
//! never reads ambient configuration: everything the default client needs
//! arrives in an explicit [`ModelConfig`]. Tests script the trait directly
//! (see [`crate::testing::ScriptedModelClient`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::{truncate_preview, AutopatchError, Result};

/// Request/response boundary to the language model.
///
/// Used for three purposes: plan generation, strategy generation, and
/// result analysis. Each call is one (system, user) prompt pair returning
/// the raw response text for the strict parser.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one prompt pair and return the raw response text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Explicit configuration for the default HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API, without the trailing route.
    pub base_url: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Bearer token; `None` for unauthenticated local endpoints.
    pub api_key: Option<String>,

    /// Completion token budget per request.
    pub max_tokens: u32,

    /// Sampling temperature; planning wants determinism, so keep it low.
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_tokens: 8192,
            temperature: 0.2,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Default [`ModelClient`] speaking the OpenAI-compatible chat API.
pub struct HttpModelClient {
    config: ModelConfig,
    http: reqwest::Client,
}

impl HttpModelClient {
    /// Create a client from explicit configuration.
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        debug!(model = %self.config.model, "sending model request");

        let mut builder = self.http.post(&url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AutopatchError::Model(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AutopatchError::Model(e.to_string()))?;

        if !status.is_success() {
            return Err(AutopatchError::Model(format!(
                "HTTP {status}: {}",
                truncate_preview(&body, 200)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            AutopatchError::Model(format!(
                "malformed completion response: {e}: {}",
                truncate_preview(&body, 200)
            ))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(AutopatchError::Model(
                "completion response contained no content".to_string(),
            ));
        }

        Ok(content)
    }
}
