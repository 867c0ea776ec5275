//! Top-k retrieval: embed the question, look up the nearest chunks.

use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_TOP_K;
use crate::embeddings::EmbeddingProvider;
use crate::stores::{QueryResult, VectorIndex};
use crate::types::RagError;

/// Retrieves the chunks nearest to a question.
///
/// Delegates the question embedding to the bound [`EmbeddingProvider`]'s
/// single-text path and the nearest-neighbor lookup to the shared
/// [`VectorIndex`].
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<VectorIndex>) -> Self {
        Self { provider, index }
    }

    /// Retrieves up to `top_k` chunks for `question`, ascending by distance.
    ///
    /// If the index holds fewer than `top_k` entries, all of them are
    /// returned; querying before any ingestion fails with
    /// [`RagError::IndexNotInitialized`].
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<QueryResult, RagError> {
        let vector = self.provider.embed_one(question).await?;
        let results = self.index.query(&vector, top_k)?;
        debug!(
            top_k,
            returned = results.len(),
            "retrieved nearest chunks for question"
        );
        Ok(results)
    }

    /// [`retrieve`](Self::retrieve) with the default fan-out of 5.
    pub async fn retrieve_default(&self, question: &str) -> Result<QueryResult, RagError> {
        self.retrieve(question, DEFAULT_TOP_K).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingProvider;
    use crate::ingestion::chunk_text;
    use crate::stores::EmbeddedChunk;

    async fn seeded_retriever(texts: &[&str]) -> Retriever {
        let provider = Arc::new(MockEmbeddingProvider::new());
        let index = Arc::new(VectorIndex::new());

        for (i, text) in texts.iter().enumerate() {
            let chunks = chunk_text(text, &format!("doc{i}"), 800, 100);
            let contents: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = provider.embed_many(&contents).await.unwrap();
            let batch: Vec<EmbeddedChunk> = chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
                .collect();
            index.insert(batch, provider.identity()).unwrap();
        }

        Retriever::new(provider, index)
    }

    #[tokio::test]
    async fn returns_at_most_k_and_at_most_indexed() {
        let retriever = seeded_retriever(&["first doc text", "second doc text"]).await;

        let two = retriever.retrieve("doc text", 2).await.unwrap();
        assert_eq!(two.len(), 2);

        // Fewer entries than top_k: return all, no padding, no error.
        let all = retriever.retrieve_default("doc text").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn distances_ascend() {
        let retriever = seeded_retriever(&[
            "rust ownership and borrowing",
            "gardening tips for tomatoes",
            "rust lifetimes explained",
        ])
        .await;

        let results = retriever.retrieve("rust borrowing", 3).await.unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn empty_index_is_reported() {
        let retriever = Retriever::new(
            Arc::new(MockEmbeddingProvider::new()),
            Arc::new(VectorIndex::new()),
        );
        let err = retriever.retrieve_default("what is this?").await.unwrap_err();
        assert!(matches!(err, RagError::IndexNotInitialized));
    }
}
