//! The long-lived pipeline context: ingestion, Q&A, and reset.
//!
//! `RagPipeline` owns the shared vector index, the bound embedding backend,
//! and the chunk store as one explicit object — there is no process-wide
//! singleton. Collaborating layers (an HTTP server, a CLI) hold the pipeline
//! and call [`ingest`](RagPipeline::ingest), [`ask`](RagPipeline::ask), and
//! [`reset`](RagPipeline::reset).

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::completion::CompletionModel;
use crate::config::PipelineConfig;
use crate::embeddings::{EmbeddingProvider, resolve_provider};
use crate::ingestion::{ChunkStore, chunk_text, fetch_clean_text, http_client, validate_url};
use crate::message::Message;
use crate::retriever::Retriever;
use crate::stores::{EmbeddedChunk, VectorIndex};
use crate::types::RagError;
use crate::workflow::RagWorkflow;

/// Maximum characters shown in a per-chunk source preview.
const PREVIEW_CHARS: usize = 100;

/// One retrieved chunk's citation entry.
#[derive(Clone, Debug, Serialize)]
pub struct SourceDetail {
    /// Source document identifier.
    pub source: String,
    /// Human-readable "Chunk k of n" label.
    pub position_info: String,
    /// Leading excerpt of the chunk text.
    pub preview: String,
}

/// The answer to one question, with cited sources in retrieval order.
#[derive(Clone, Debug, Serialize)]
pub struct AskOutcome {
    pub question: String,
    pub answer: String,
    /// Source identifier per retrieved chunk, retrieval order (may repeat).
    pub sources: Vec<String>,
    pub source_details: Vec<SourceDetail>,
    pub retrieved: usize,
}

/// Current pipeline state for status reporting.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineStatus {
    pub indexed_chunks: usize,
    pub embedding_identity: String,
}

/// The retrieval pipeline: chunker configuration, chunk store, bound
/// embedding backend, shared vector index, and completion model.
pub struct RagPipeline {
    config: PipelineConfig,
    chunk_store: ChunkStore,
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    completion: Arc<dyn CompletionModel>,
}

impl RagPipeline {
    /// Builds a pipeline, resolving the embedding backend chain.
    ///
    /// Fails with [`RagError::EmbeddingUnavailable`] when no backend in the
    /// configured chain initializes; this is fatal and not retried.
    pub async fn new(
        config: PipelineConfig,
        completion: Arc<dyn CompletionModel>,
    ) -> Result<Self, RagError> {
        let provider = resolve_provider(&config.embedding_chain, config.request_timeout).await?;
        Ok(Self::with_parts(config, provider, completion))
    }

    /// Builds a pipeline around an explicit embedding backend.
    pub fn with_parts(
        config: PipelineConfig,
        provider: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionModel>,
    ) -> Self {
        let chunk_store = ChunkStore::new(&config.chunk_dir);
        Self {
            config,
            chunk_store,
            provider,
            index: Arc::new(VectorIndex::new()),
            completion,
        }
    }

    /// Shared handle to the vector index.
    pub fn index(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.index)
    }

    /// Chunks `text`, persists the chunk set for `source`, embeds the batch,
    /// and appends it to the index. Returns the number of chunks ingested.
    ///
    /// Re-ingesting a source overwrites its persisted chunk set; fallback
    /// text from a failed extraction is ingested as ordinary content.
    pub async fn ingest(&self, text: &str, source: &str) -> Result<usize, RagError> {
        if source.trim().is_empty() {
            return Err(RagError::Validation(
                "source identifier cannot be empty".into(),
            ));
        }

        let chunks = chunk_text(
            text,
            source,
            self.config.max_chunk_chars,
            self.config.chunk_overlap,
        );
        self.chunk_store.persist(source, &chunks).await?;
        if chunks.is_empty() {
            info!(source, "document produced no chunks, nothing to index");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.provider.embed_many(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "backend returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let count = chunks.len();
        let batch: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();
        self.index.insert(batch, self.provider.identity())?;
        info!(source, chunks = count, "ingested document");
        Ok(count)
    }

    /// Fetches a web page, reduces it to plain text, and ingests it with the
    /// URL as the source identifier.
    ///
    /// Only URL validation can fail here before ingestion; fetch problems
    /// degrade to fallback text that is ingested like any other content.
    pub async fn ingest_url(&self, raw_url: &str) -> Result<usize, RagError> {
        let url = validate_url(raw_url)?;
        let client = http_client(self.config.request_timeout)?;
        let text = fetch_clean_text(&client, &url).await;
        self.ingest(&text, url.as_str()).await
    }

    /// Ingests several documents, isolating per-document failures: one bad
    /// document is logged and skipped, the rest still land in the index.
    pub async fn ingest_all(
        &self,
        documents: Vec<(String, String)>,
    ) -> Vec<(String, Result<usize, RagError>)> {
        let mut results = Vec::with_capacity(documents.len());
        for (text, source) in documents {
            let outcome = self.ingest(&text, &source).await;
            if let Err(err) = &outcome {
                if err.is_document_local() {
                    warn!(source, error = %err, "skipping document after ingestion failure");
                } else {
                    error!(source, error = %err, "document ingestion failed");
                }
            }
            results.push((source, outcome));
        }
        results
    }

    /// Answers a question over the ingested corpus.
    ///
    /// Blank questions are rejected before any pipeline work. Querying
    /// before any ingestion fails with [`RagError::IndexNotInitialized`];
    /// generation failures abort only this query and leave the index intact.
    pub async fn ask(
        &self,
        question: &str,
        chat_history: Vec<Message>,
    ) -> Result<AskOutcome, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::Validation("question cannot be empty".into()));
        }

        let workflow = RagWorkflow::new(
            self.retriever(),
            Arc::clone(&self.completion),
            self.config.top_k,
        );
        let state = workflow.invoke(question, chat_history).await?;

        let answer = state
            .answer
            .ok_or_else(|| RagError::Generation("workflow finished without an answer".into()))?;
        let sources = state
            .retrieved_docs
            .iter()
            .map(|doc| doc.chunk.source.clone())
            .collect();
        let source_details = state
            .retrieved_docs
            .iter()
            .map(|doc| SourceDetail {
                source: doc.chunk.source.clone(),
                position_info: doc.chunk.position_info.clone(),
                preview: preview(&doc.chunk.text),
            })
            .collect();

        Ok(AskOutcome {
            question: question.to_string(),
            answer,
            sources,
            source_details,
            retrieved: state.retrieved_docs.len(),
        })
    }

    /// Clears the vector index and removes persisted chunk files, returning
    /// the system to its pre-ingestion state.
    pub async fn reset(&self) -> Result<(), RagError> {
        self.index.reset();
        self.chunk_store.clear().await?;
        info!("pipeline reset: index cleared, chunk files removed");
        Ok(())
    }

    /// Reports the indexed chunk count and the active embedding identity.
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            indexed_chunks: self.index.len(),
            embedding_identity: self.provider.identity().to_string(),
        }
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(Arc::clone(&self.provider), Arc::clone(&self.index))
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(PREVIEW_CHARS).collect();
        short.push_str("...");
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_text() {
        let long = "x".repeat(150);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);

        assert_eq!(preview("short"), "short");
    }
}
