//! In-memory append-only vector index.

use parking_lot::RwLock;
use tracing::debug;

use crate::stores::{EmbeddedChunk, QueryResult, ScoredChunk, cosine_distance};
use crate::types::RagError;

#[derive(Debug)]
struct IndexInner {
    entries: Vec<EmbeddedChunk>,
    dimension: usize,
    model_identity: String,
}

/// Append-only similarity index over embedded chunks.
///
/// The index is created lazily by the first insert, which fixes the vector
/// dimension and the embedding-backend identity; later batches from a
/// different space are rejected rather than silently corrupting distance
/// comparisons. Inserts serialize behind a write lock, and queries take a
/// read lock so they always see a fully-applied batch, never a partial one.
///
/// There is no per-chunk update or delete; [`reset`](VectorIndex::reset) is
/// the only mutation besides insert.
#[derive(Debug, Default)]
pub struct VectorIndex {
    inner: RwLock<Option<IndexInner>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch of embedded chunks.
    ///
    /// The first non-empty batch initializes the index with the batch's
    /// dimension and `model_identity`. Every vector in every batch must
    /// match both; mismatches fail with
    /// [`RagError::EmbeddingSpaceMismatch`] and leave the index unchanged.
    pub fn insert(&self, batch: Vec<EmbeddedChunk>, model_identity: &str) -> Result<(), RagError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut guard = self.inner.write();
        let dimension = match guard.as_ref() {
            Some(inner) => {
                if inner.model_identity != model_identity {
                    return Err(RagError::EmbeddingSpaceMismatch {
                        expected: inner.model_identity.clone(),
                        actual: model_identity.to_string(),
                    });
                }
                inner.dimension
            }
            None => batch[0].vector.len(),
        };

        if let Some(bad) = batch.iter().find(|e| e.vector.len() != dimension) {
            return Err(RagError::EmbeddingSpaceMismatch {
                expected: format!("{dimension}-dimensional vectors"),
                actual: format!("{}-dimensional vector", bad.vector.len()),
            });
        }

        let inner = guard.get_or_insert_with(|| IndexInner {
            entries: Vec::new(),
            dimension,
            model_identity: model_identity.to_string(),
        });
        debug!(
            batch = batch.len(),
            total = inner.entries.len() + batch.len(),
            "appended batch to vector index"
        );
        inner.entries.extend(batch);
        Ok(())
    }

    /// Returns the `k` entries nearest to `vector`, ascending by cosine
    /// distance, ties broken by insertion order (earlier wins).
    ///
    /// Fails with [`RagError::IndexNotInitialized`] when nothing has been
    /// ingested yet: a query against an empty index is a precondition
    /// failure, not an empty success.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<QueryResult, RagError> {
        let guard = self.inner.read();
        let inner = guard.as_ref().ok_or(RagError::IndexNotInitialized)?;
        if inner.entries.is_empty() {
            return Err(RagError::IndexNotInitialized);
        }
        if vector.len() != inner.dimension {
            return Err(RagError::EmbeddingSpaceMismatch {
                expected: format!("{}-dimensional vectors", inner.dimension),
                actual: format!("{}-dimensional query", vector.len()),
            });
        }

        let mut scored: Vec<ScoredChunk> = inner
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                distance: cosine_distance(vector, &entry.vector),
            })
            .collect();
        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .as_ref()
            .map_or(0, |inner| inner.entries.len())
    }

    /// `true` when nothing has been ingested.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the embedding backend whose vectors the index holds.
    pub fn model_identity(&self) -> Option<String> {
        self.inner
            .read()
            .as_ref()
            .map(|inner| inner.model_identity.clone())
    }

    /// Clears the index entirely, logically equivalent to recreating it
    /// empty: the next insert may use a fresh embedding space.
    pub fn reset(&self) {
        *self.inner.write() = None;
    }
}
