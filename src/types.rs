//! Shared error taxonomy for the retrieval pipeline.

use thiserror::Error;

/// Errors surfaced by ingestion, retrieval, and the Q&A workflow.
///
/// The variants map to distinct failure policies:
///
/// - [`RagError::Validation`] is rejected before any pipeline work runs.
/// - [`RagError::Extraction`] is logged and degraded to fallback text rather
///   than aborting ingestion.
/// - [`RagError::EmbeddingUnavailable`] is fatal at startup; the pipeline
///   cannot ingest or retrieve without an embedding backend.
/// - [`RagError::IndexNotInitialized`] is a precondition failure reported to
///   the caller when a query arrives before any ingestion.
/// - [`RagError::Generation`] aborts only the current query; the index stays
///   intact for subsequent questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// Bad caller input (empty question, empty source, malformed URL).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A source document could not be read or cleaned.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Every embedding backend in the fallback chain failed to initialize.
    #[error("no embedding backend available: {0}")]
    EmbeddingUnavailable(String),

    /// A query arrived before any document was ingested.
    #[error("vector index not initialized: ingest at least one document before querying")]
    IndexNotInitialized,

    /// An insert or query used vectors from a different embedding space than
    /// the one the index was initialized with.
    #[error("embedding space mismatch: index holds '{expected}', got '{actual}'")]
    EmbeddingSpaceMismatch { expected: String, actual: String },

    /// An embedding backend failed while producing vectors.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The text-completion call failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Chunk persistence or other storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// `true` when the failure is local to one document and the rest of a
    /// batch ingestion should proceed.
    pub fn is_document_local(&self) -> bool {
        matches!(
            self,
            RagError::Validation(_) | RagError::Extraction(_) | RagError::Storage(_)
        )
    }
}
