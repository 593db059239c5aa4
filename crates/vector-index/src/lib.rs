//! # Dossier Vector Index
//!
//! Per-project in-memory vector collections over an embedding provider.
//!
//! Each project owns one named collection keyed by `{organization}_{project}`
//! (whitespace sanitized). `reindex` rebuilds a collection wholesale: chunks
//! are embedded first, then the old collection is dropped and the new one
//! installed in a single critical section, so queries never observe stale
//! chunks mixed with a partial rebuild.
//!
//! Embeddings come from an [`EmbeddingProvider`]: either a remote
//! `embedContent` API or a deterministic hash backend for offline runs and
//! tests, selected by `DOSSIER_EMBEDDING_MODE` (`api` | `hash`).

mod embeddings;
mod error;
mod index;

pub use embeddings::{embedder_from_env, ApiEmbedder, EmbeddingProvider, HashEmbedder};
pub use error::{Result, VectorIndexError};
pub use index::{collection_id, ScoredChunk, VectorIndex};
