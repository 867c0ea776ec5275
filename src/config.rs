//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::embeddings::EmbeddingKind;

/// Default maximum chunk size in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 800;
/// Default overlap copied from the tail of one chunk into the next.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
/// Default number of chunks returned by retrieval.
pub const DEFAULT_TOP_K: usize = 5;

/// Configuration for a [`RagPipeline`](crate::pipeline::RagPipeline).
///
/// Chunking bounds are fixed for the lifetime of the pipeline; changing them
/// between ingestions of the same source would produce inconsistent overlap
/// between stored chunk sets.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Maximum characters per chunk.
    pub max_chunk_chars: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Directory holding one persisted chunk file per source.
    pub chunk_dir: PathBuf,
    /// Timeout applied to remote embedding and completion calls.
    pub request_timeout: Duration,
    /// Embedding backends to try at startup, in preference order. The first
    /// backend that initializes successfully is bound for the process
    /// lifetime; switching mid-session would break vector comparability.
    pub embedding_chain: Vec<EmbeddingKind>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            chunk_dir: PathBuf::from("data/chunks"),
            request_timeout: Duration::from_secs(30),
            embedding_chain: EmbeddingKind::default_chain(),
        }
    }
}

impl PipelineConfig {
    /// Set the chunking bounds.
    ///
    /// # Panics
    ///
    /// Panics if `overlap >= max_chars`; the chunker could not make forward
    /// progress otherwise.
    #[must_use]
    pub fn with_chunking(mut self, max_chars: usize, overlap: usize) -> Self {
        assert!(
            overlap < max_chars,
            "chunk overlap ({overlap}) must be smaller than max chunk size ({max_chars})"
        );
        self.max_chunk_chars = max_chars;
        self.chunk_overlap = overlap;
        self
    }

    /// Set the retrieval fan-out.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the directory used for persisted chunk files.
    #[must_use]
    pub fn with_chunk_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chunk_dir = dir.into();
        self
    }

    /// Set the embedding backend preference order.
    #[must_use]
    pub fn with_embedding_chain(mut self, chain: Vec<EmbeddingKind>) -> Self {
        self.embedding_chain = chain;
        self
    }
}

/// Loads `.env` into the process environment if present.
///
/// Remote backends read their credentials (`OPENAI_API_KEY`,
/// `OPENAI_API_BASE`, model names) from the environment after this runs.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}
