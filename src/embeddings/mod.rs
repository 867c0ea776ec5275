//! Embedding backends and the startup fallback chain.
//!
//! All vectors inserted into one index must come from the same embedding
//! space, so the backend is chosen once at startup and bound for the process
//! lifetime. The chain is an explicit ordered list of constructors: each
//! variant is tried in turn and the first that initializes successfully wins.
//! If every variant fails, initialization is fatal
//! ([`RagError::EmbeddingUnavailable`]) and is not retried.

pub mod mock;
#[cfg(feature = "local-embeddings")]
pub mod neural;
pub mod remote;
pub mod tfidf;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::types::RagError;

pub use mock::MockEmbeddingProvider;
#[cfg(feature = "local-embeddings")]
pub use neural::NeuralEmbedder;
pub use remote::RemoteEmbedder;
pub use tfidf::TfIdfEmbedder;

/// Maps text into fixed-dimension vectors for distance comparison.
///
/// Implementations must return one vector per input, in input order, and
/// must keep `embed_many` and `embed_one` in the same vector space: a query
/// embedded with `embed_one` is compared directly against document vectors
/// produced by `embed_many`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of documents. Output order matches input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single query text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Stable identifier for this backend's vector space. The index records
    /// it on first insert and rejects vectors from any other identity.
    fn identity(&self) -> &str;
}

/// The embedding backend variants, in the order the default chain tries them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingKind {
    /// Fit-on-corpus TF-IDF vectorization; fully local, no model download.
    Statistical,
    /// Pretrained sentence-embedding model run locally
    /// (requires the `local-embeddings` feature and a model directory).
    LocalNeural,
    /// OpenAI-compatible embeddings API (requires `OPENAI_API_KEY`).
    Remote,
}

impl EmbeddingKind {
    /// The default preference order: local statistical first, then the
    /// pretrained local model, then the remote API.
    pub fn default_chain() -> Vec<EmbeddingKind> {
        vec![
            EmbeddingKind::Statistical,
            EmbeddingKind::LocalNeural,
            EmbeddingKind::Remote,
        ]
    }
}

/// Tries each backend in `chain` and binds the first that initializes.
pub async fn resolve_provider(
    chain: &[EmbeddingKind],
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    let mut failures = Vec::new();
    for kind in chain {
        match construct(*kind, timeout) {
            Ok(provider) => {
                info!(identity = provider.identity(), "embedding backend selected");
                return Ok(provider);
            }
            Err(err) => {
                warn!(backend = ?kind, error = %err, "embedding backend unavailable");
                failures.push(format!("{kind:?}: {err}"));
            }
        }
    }
    Err(RagError::EmbeddingUnavailable(failures.join("; ")))
}

fn construct(
    kind: EmbeddingKind,
    timeout: Duration,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    match kind {
        EmbeddingKind::Statistical => Ok(Arc::new(TfIdfEmbedder::new())),
        #[cfg(feature = "local-embeddings")]
        EmbeddingKind::LocalNeural => Ok(Arc::new(NeuralEmbedder::from_env()?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingKind::LocalNeural => Err(RagError::Embedding(
            "built without the local-embeddings feature".into(),
        )),
        EmbeddingKind::Remote => Ok(Arc::new(RemoteEmbedder::from_env(timeout)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_chain_binds_the_statistical_backend() {
        let provider = resolve_provider(&EmbeddingKind::default_chain(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(provider.identity(), "tfidf");
    }

    #[tokio::test]
    async fn empty_chain_is_fatal() {
        let err = match resolve_provider(&[], Duration::from_secs(5)).await {
            Ok(_) => panic!("expected an error from an empty chain"),
            Err(err) => err,
        };
        assert!(matches!(err, RagError::EmbeddingUnavailable(_)));
    }
}
