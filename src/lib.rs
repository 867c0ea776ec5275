//! # Ragweave: document Q&A retrieval pipeline
//!
//! Ragweave ingests unstructured documents and answers natural-language
//! questions about them: text is chunked, embedded, and indexed for
//! nearest-neighbor retrieval, and a fixed two-stage workflow feeds the
//! retrieved passages plus the question to a text-completion capability.
//!
//! ```text
//! raw text ──► ingestion::chunk_text ──► Chunk records ──► ChunkStore (audit files)
//!                                              │
//!                                              ▼
//!                      embeddings::EmbeddingProvider::embed_many
//!                                              │
//!                                              ▼
//!                              stores::VectorIndex (append-only)
//!
//! question ──► Retriever (embed_one + index query) ──► workflow::RagWorkflow
//!                                                          │ retrieve stage
//!                                                          │ generate stage
//!                                                          ▼
//!                                            answer + cited sources
//! ```
//!
//! The embedding backend is chosen once at startup from an ordered fallback
//! chain (local statistical → pretrained local → remote API) and stays bound
//! for the process lifetime so every vector in the index comes from one
//! space. [`pipeline::RagPipeline`] ties the pieces together for callers.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragweave::completion::OpenAiCompletion;
//! use ragweave::config::PipelineConfig;
//! use ragweave::pipeline::RagPipeline;
//!
//! # async fn demo() -> Result<(), ragweave::types::RagError> {
//! let config = PipelineConfig::default();
//! let completion = Arc::new(OpenAiCompletion::from_env(config.request_timeout)?);
//! let pipeline = RagPipeline::new(config, completion).await?;
//!
//! pipeline.ingest("The sky is blue.", "notes.txt").await?;
//! let outcome = pipeline.ask("What color is the sky?", Vec::new()).await?;
//! println!("{} (from {:?})", outcome.answer, outcome.sources);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod config;
pub mod embeddings;
pub mod ingestion;
pub mod message;
pub mod pipeline;
pub mod retriever;
pub mod stores;
pub mod types;
pub mod workflow;

pub use completion::CompletionModel;
pub use config::PipelineConfig;
pub use embeddings::{EmbeddingKind, EmbeddingProvider};
pub use ingestion::{Chunk, ChunkStore, chunk_text};
pub use message::Message;
pub use pipeline::{AskOutcome, RagPipeline};
pub use retriever::Retriever;
pub use stores::{EmbeddedChunk, QueryResult, ScoredChunk, VectorIndex};
pub use types::RagError;
pub use workflow::{RagWorkflow, WorkflowState};
