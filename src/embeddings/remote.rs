//! OpenAI-compatible remote embedding backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::types::RagError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Remote embedding backend over an OpenAI-compatible `/embeddings` endpoint.
///
/// Requires `OPENAI_API_KEY`; `OPENAI_API_BASE` and `OPENAI_EMBEDDING_MODEL`
/// override the endpoint and model. Requests carry the configured timeout so
/// a stalled endpoint fails instead of hanging the pipeline.
pub struct RemoteEmbedder {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    identity: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    /// Builds the backend from environment configuration.
    pub fn from_env(timeout: Duration) -> Result<Self, RagError> {
        crate::config::load_env();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Embedding("OPENAI_API_KEY is not set".into()))?;
        let base_url =
            std::env::var("OPENAI_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("OPENAI_EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, base_url, api_key, model))
    }

    /// Builds the backend against an explicit endpoint (used by tests).
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let identity = format!("remote:{model}");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model,
            identity,
        }
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let response: EmbeddingsResponse = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedding endpoint returned {} vectors for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }

        // The API tags each vector with its input index; restore input order.
        let mut rows = response.data;
        rows.sort_by_key(|row| row.index);
        debug!(model = %self.model, batch = texts.len(), "embedded batch remotely");
        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.request(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("embedding endpoint returned no vector".into()))
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}
