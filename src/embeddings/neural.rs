//! Pretrained local sentence-embedding backend (feature `local-embeddings`).
//!
//! The model is loaded from a local directory (a sentence-transformers
//! export such as all-MiniLM-L6-v2) and runs on a dedicated worker thread:
//! the underlying torch handles are not `Sync`, so the model stays on one
//! thread and requests cross a channel.

use std::path::PathBuf;

use async_trait::async_trait;
use flume::{Receiver, Sender};
use rust_bert::pipelines::sentence_embeddings::SentenceEmbeddingsBuilder;
use tracing::info;

use crate::embeddings::EmbeddingProvider;
use crate::types::RagError;

struct EmbedJob {
    texts: Vec<String>,
    respond: Sender<Result<Vec<Vec<f32>>, String>>,
}

/// Local neural embedding backend.
pub struct NeuralEmbedder {
    jobs: Sender<EmbedJob>,
    identity: String,
}

impl NeuralEmbedder {
    /// Loads the model directory named by `RAGWEAVE_EMBED_MODEL_DIR`.
    pub fn from_env() -> Result<Self, RagError> {
        crate::config::load_env();
        let dir = std::env::var("RAGWEAVE_EMBED_MODEL_DIR")
            .map_err(|_| RagError::Embedding("RAGWEAVE_EMBED_MODEL_DIR is not set".into()))?;
        Self::from_model_dir(dir)
    }

    /// Loads a sentence-embedding model from a local directory.
    pub fn from_model_dir(dir: impl Into<PathBuf>) -> Result<Self, RagError> {
        let dir = dir.into();
        let identity = format!(
            "local:{}",
            dir.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "model".to_string())
        );

        let (jobs_tx, jobs_rx) = flume::unbounded::<EmbedJob>();
        let (ready_tx, ready_rx) = flume::bounded::<Result<(), String>>(1);
        std::thread::spawn(move || worker(dir, jobs_rx, ready_tx));

        ready_rx
            .recv()
            .map_err(|_| RagError::Embedding("embedding worker exited before initializing".into()))?
            .map_err(RagError::Embedding)?;

        info!(identity = %identity, "loaded local sentence-embedding model");
        Ok(Self {
            jobs: jobs_tx,
            identity,
        })
    }

    async fn submit(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RagError> {
        let (respond, receive) = flume::bounded(1);
        self.jobs
            .send(EmbedJob { texts, respond })
            .map_err(|_| RagError::Embedding("embedding worker is gone".into()))?;
        receive
            .recv_async()
            .await
            .map_err(|_| RagError::Embedding("embedding worker dropped the request".into()))?
            .map_err(RagError::Embedding)
    }
}

fn worker(dir: PathBuf, jobs: Receiver<EmbedJob>, ready: Sender<Result<(), String>>) {
    let model = match SentenceEmbeddingsBuilder::local(dir).create_model() {
        Ok(model) => {
            let _ = ready.send(Ok(()));
            model
        }
        Err(err) => {
            let _ = ready.send(Err(err.to_string()));
            return;
        }
    };

    while let Ok(job) = jobs.recv() {
        let result = model.encode(&job.texts).map_err(|err| err.to_string());
        let _ = job.respond.send(result);
    }
}

#[async_trait]
impl EmbeddingProvider for NeuralEmbedder {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.submit(texts.to_vec()).await
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.submit(vec![text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("model returned no vector".into()))
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}
