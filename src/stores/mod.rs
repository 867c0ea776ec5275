//! Vector storage for embedded chunks.
//!
//! ```text
//!                 ┌───────────────────┐
//!  insert batches │    VectorIndex    │  query(vector, k)
//! ───────────────►│  (append-only,    ├──────────────────► QueryResult
//!                 │   process-local)  │   ascending distance
//!                 └───────────────────┘
//! ```
//!
//! The index lives for the process lifetime only; durable chunk records are
//! handled separately by [`crate::ingestion::ChunkStore`] and the index is
//! rebuilt by re-ingestion, never reloaded from disk.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::ingestion::Chunk;

pub use memory::VectorIndex;

/// A chunk paired with its embedding vector.
///
/// Invariant: every vector in a given index has the same dimension and was
/// produced by the same embedding backend identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A retrieved chunk with its distance to the query vector (smaller is
/// closer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Ordered retrieval result: ascending distance, length ≤ requested k.
pub type QueryResult = Vec<ScoredChunk>;

/// Cosine distance (1 − cosine similarity).
///
/// Zero-norm vectors carry no directional information and are placed at the
/// maximum distance for non-negative spaces.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
