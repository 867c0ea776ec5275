//! Durable chunk records, one JSON file per source.
//!
//! The persisted files exist for auditability: they record exactly which
//! chunks a source produced, but they are never reloaded into the vector
//! index automatically. The index is rebuilt only by re-ingestion.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::ingestion::chunker::Chunk;
use crate::types::RagError;

/// Filesystem-backed store of per-source chunk records.
///
/// Source identifiers are normalized into deterministic file names so
/// re-ingesting a source overwrites its prior chunk set instead of
/// appending a second copy.
#[derive(Clone, Debug)]
pub struct ChunkStore {
    root: PathBuf,
}

impl ChunkStore {
    /// Creates a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Computes the file path holding the chunk set for `source`.
    pub fn path_for(&self, source: &str) -> PathBuf {
        self.root
            .join(format!("{}_chunks.json", sanitize_component(source)))
    }

    /// Persists the chunk sequence for `source`, replacing any prior set.
    pub async fn persist(&self, source: &str, chunks: &[Chunk]) -> Result<(), RagError> {
        fs::create_dir_all(&self.root).await?;
        let path = self.path_for(source);
        let serialized = serde_json::to_string_pretty(chunks)
            .map_err(|err| RagError::Storage(err.to_string()))?;
        fs::write(&path, serialized).await?;
        debug!(source, chunks = chunks.len(), path = %path.display(), "persisted chunk set");
        Ok(())
    }

    /// Loads the persisted chunk set for `source`, if one exists.
    pub async fn load(&self, source: &str) -> Result<Option<Vec<Chunk>>, RagError> {
        let path = self.path_for(source);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path).await?;
        let chunks =
            serde_json::from_str(&data).map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(Some(chunks))
    }

    /// Removes every persisted chunk file, returning the store to its
    /// pre-ingestion state.
    pub async fn clear(&self) -> Result<(), RagError> {
        if !self.root.exists() {
            return Ok(());
        }
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with("_chunks.json"))
            {
                fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
