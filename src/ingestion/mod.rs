//! Ingestion utilities for turning external documents into indexed chunks.
//!
//! The helpers in this module provide three capabilities:
//!
//! * [`chunker`] — recursive character splitting with bounded size and
//!   fixed overlap between adjacent segments.
//! * [`store`] — one durable JSON chunk file per source, for auditability.
//! * [`fetch`] — best-effort web page fetching and cleaning (collaborator
//!   adapter; failures degrade to fallback text, never abort ingestion).

pub mod chunker;
pub mod fetch;
pub mod store;

pub use chunker::{Chunk, chunk_text};
pub use fetch::{clean_html, fetch_clean_text, http_client, validate_url};
pub use store::ChunkStore;
