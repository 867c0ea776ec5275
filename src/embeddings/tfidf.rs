//! Fit-on-corpus TF-IDF embeddings.
//!
//! This is the purely local statistical backend: no model download, no
//! network. The vector space is fit from the first ingested batch and frozen
//! afterwards, which keeps vectors from independent batches comparable.
//!
//! # Known consistency weakness
//!
//! The space is fit on whatever corpus arrives first. A query embedded via
//! [`TfIdfEmbedder::embed_one`] before any document batch fits a degenerate
//! single-text space, and vocabulary that only appears in later batches is
//! invisible to the frozen space. A corrected design would freeze the space
//! after an explicit fit phase or use a fixed-vocabulary embedding; this
//! implementation stays faithful to the fit-once-on-first-use behavior.

use std::sync::OnceLock;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::types::RagError;

/// Upper bound on vocabulary size; the most document-frequent terms win.
const MAX_FEATURES: usize = 1000;

/// English stopwords removed before term counting.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "if", "in", "into",
    "is", "it", "its", "just", "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "would", "you", "your", "yours",
];

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("token pattern is valid"))
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|token| token.len() > 1 && !is_stopword(token))
        .collect()
}

/// Unigrams plus adjacent bigrams over the filtered token stream.
fn terms(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut out = Vec::with_capacity(tokens.len() * 2);
    for pair in tokens.windows(2) {
        out.push(format!("{} {}", pair[0], pair[1]));
    }
    out.extend(tokens);
    out
}

#[derive(Debug)]
struct FittedModel {
    vocabulary: FxHashMap<String, usize>,
    idf: Vec<f32>,
}

impl FittedModel {
    fn fit(corpus: &[String]) -> Result<Self, RagError> {
        let mut document_frequency: FxHashMap<String, usize> = FxHashMap::default();
        for doc in corpus {
            let unique: FxHashSet<String> = terms(doc).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(RagError::Embedding(
                "corpus produced no vocabulary (only stopwords or empty text)".into(),
            ));
        }

        // Keep the most document-frequent terms, ties broken alphabetically
        // so the fitted space is deterministic for a given corpus.
        let mut ranked: Vec<(String, usize)> = document_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(MAX_FEATURES);
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        let total_docs = corpus.len() as f32;
        let mut vocabulary = FxHashMap::default();
        let mut idf = Vec::with_capacity(ranked.len());
        for (index, (term, df)) in ranked.into_iter().enumerate() {
            // Smoothed inverse document frequency.
            idf.push(((1.0 + total_docs) / (1.0 + df as f32)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Ok(Self { vocabulary, idf })
    }

    fn transform(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for term in terms(text) {
            if let Some(&index) = self.vocabulary.get(&term) {
                vector[index] += self.idf[index];
            }
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[derive(Debug, Default)]
struct TfIdfState {
    corpus: Vec<String>,
    model: Option<FittedModel>,
}

/// The local statistical embedding backend.
///
/// [`embed_many`](EmbeddingProvider::embed_many) extends the fitting corpus
/// and fits the space on the first call; subsequent batches are transformed
/// with the frozen vocabulary so their vectors stay comparable.
/// [`embed_one`](EmbeddingProvider::embed_one) before any fit falls back to
/// fitting on the single query text (see the module docs for the caveat).
#[derive(Debug, Default)]
pub struct TfIdfEmbedder {
    state: Mutex<TfIdfState>,
}

impl TfIdfEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dimension of the fitted space, if fitting has happened.
    pub fn dimension(&self) -> Option<usize> {
        self.state
            .lock()
            .model
            .as_ref()
            .map(|model| model.vocabulary.len())
    }
}

#[async_trait]
impl EmbeddingProvider for TfIdfEmbedder {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut state = self.state.lock();
        state.corpus.extend(texts.iter().cloned());
        if state.model.is_none() {
            let model = FittedModel::fit(&state.corpus)?;
            debug!(
                features = model.vocabulary.len(),
                documents = state.corpus.len(),
                "fitted tf-idf space"
            );
            state.model = Some(model);
        }
        let model = state.model.as_ref().expect("model fitted above");
        Ok(texts.iter().map(|text| model.transform(text)).collect())
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut state = self.state.lock();
        if state.model.is_none() {
            // Degenerate fit on the lone query text; vectors produced here
            // shift meaning once a real corpus arrives.
            state.model = Some(FittedModel::fit(std::slice::from_ref(
                &text.to_string(),
            ))?);
        }
        let model = state.model.as_ref().expect("model fitted above");
        Ok(model.transform(text))
    }

    fn identity(&self) -> &str {
        "tfidf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn stopword_table_is_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[tokio::test]
    async fn batch_embedding_fits_once_and_keeps_dimension() {
        let embedder = TfIdfEmbedder::new();
        let first = vec![
            "the sky is blue today".to_string(),
            "grass is green in spring".to_string(),
        ];
        let vectors = embedder.embed_many(&first).await.unwrap();
        let dim = vectors[0].len();
        assert!(dim > 0);
        assert!(vectors.iter().all(|v| v.len() == dim));

        // A later batch with new vocabulary reuses the frozen space.
        let second = vec!["submarines travel underwater".to_string()];
        let more = embedder.embed_many(&second).await.unwrap();
        assert_eq!(more[0].len(), dim);
        assert_eq!(embedder.dimension(), Some(dim));
    }

    #[tokio::test]
    async fn query_lands_nearest_the_relevant_document() {
        let embedder = TfIdfEmbedder::new();
        let docs = vec![
            "the sky is blue and wide".to_string(),
            "compilers translate source code".to_string(),
        ];
        let doc_vectors = embedder.embed_many(&docs).await.unwrap();
        let query = embedder.embed_one("what color is the sky").await.unwrap();

        let sim_sky = cosine(&query, &doc_vectors[0]);
        let sim_compiler = cosine(&query, &doc_vectors[1]);
        assert!(
            sim_sky > sim_compiler,
            "expected sky doc to be closer: {sim_sky} vs {sim_compiler}"
        );
    }

    #[tokio::test]
    async fn embed_one_before_any_fit_uses_degenerate_corpus() {
        let embedder = TfIdfEmbedder::new();
        let vector = embedder.embed_one("lonely query text").await.unwrap();
        assert!(!vector.is_empty());
        // The degenerate space is frozen afterwards.
        let dim = vector.len();
        assert_eq!(embedder.dimension(), Some(dim));
    }

    #[tokio::test]
    async fn stopword_only_corpus_is_an_error() {
        let embedder = TfIdfEmbedder::new();
        let err = embedder
            .embed_many(&["the and of to".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[test]
    fn tokenizer_drops_stopwords_and_short_tokens() {
        let tokens = tokenize("The quick brown fox, a fox!");
        assert_eq!(tokens, vec!["quick", "brown", "fox", "fox"]);
    }

    #[test]
    fn vectors_are_l2_normalized() {
        let model = FittedModel::fit(&["alpha beta gamma".to_string()]).unwrap();
        let vector = model.transform("alpha beta");
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
