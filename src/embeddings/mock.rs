//! Deterministic embedding provider for tests.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rustc_hash::FxHasher;

use crate::embeddings::EmbeddingProvider;
use crate::types::RagError;

const DIMENSION: usize = 32;

/// Hash-bucket embeddings: identical text always maps to the identical
/// vector, and texts sharing tokens correlate. Suitable for deterministic
/// pipeline tests without fitting state or network access.
#[derive(Debug, Default)]
pub struct MockEmbeddingProvider;

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }

    fn embed(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIMENSION];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let mut hasher = FxHasher::default();
            token.hash(&mut hasher);
            vector[(hasher.finish() as usize) % DIMENSION] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        } else {
            vector[0] = 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| Self::embed(text)).collect())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(Self::embed(text))
    }

    fn identity(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "hello world".to_string(),
            "goodbye world".to_string(),
            "hello world".to_string(),
        ];
        let first = provider.embed_many(&inputs).await.unwrap();
        let second = provider.embed_many(&inputs).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn query_path_matches_batch_path() {
        let provider = MockEmbeddingProvider::new();
        let batch = provider
            .embed_many(&["shared text".to_string()])
            .await
            .unwrap();
        let single = provider.embed_one("shared text").await.unwrap();
        assert_eq!(batch[0], single);
    }
}
