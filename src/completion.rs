//! The opaque text-completion capability consumed by the generation stage.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::types::RagError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Synchronous-from-the-caller's-perspective text completion.
///
/// The workflow treats this as an opaque capability: it hands over a fully
/// rendered prompt and takes back text. Failures abort only the current
/// query and surface as [`RagError::Generation`].
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RagError>;
}

/// Completion over an OpenAI-compatible `/chat/completions` endpoint.
///
/// Configured from the environment: `OPENAI_API_KEY` (required),
/// `OPENAI_API_BASE` and `OPENAI_CHAT_MODEL` (optional overrides).
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiCompletion {
    /// Builds the completion client from environment configuration.
    pub fn from_env(timeout: Duration) -> Result<Self, RagError> {
        crate::config::load_env();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Generation("OPENAI_API_KEY is not set".into()))?;
        let base_url =
            std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("OPENAI_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagError::Generation(err.to_string()))?;
        Ok(Self::new(client, base_url, api_key, model))
    }

    /// Builds the client against an explicit endpoint (used by tests).
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.0,
            }))
            .send()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Generation(err.to_string()))?
            .json()
            .await
            .map_err(|err| RagError::Generation(err.to_string()))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation("completion returned no choices".into()))?;
        debug!(model = %self.model, chars = answer.len(), "received completion");
        Ok(answer)
    }
}

/// Canned completion for tests: records every prompt it receives and
/// returns a fixed response.
#[derive(Debug, Default)]
pub struct MockCompletion {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletion {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionModel for MockCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Completion that always fails; exercises generation-failure paths.
#[derive(Debug, Default)]
pub struct FailingCompletion;

#[async_trait]
impl CompletionModel for FailingCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, RagError> {
        Err(RagError::Generation("simulated completion failure".into()))
    }
}
