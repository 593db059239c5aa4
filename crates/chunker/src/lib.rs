//! # Dossier Chunker
//!
//! Word-window chunking for reference documents.
//!
//! Reference documents are split on whitespace into non-overlapping windows
//! of a fixed number of words (400 by default). Each window becomes one
//! retrieval unit with a stable `{filename}_{index}` identifier, so a
//! re-index of the same document always produces the same ids in the same
//! order.

mod chunker;
mod config;
mod error;

pub use chunker::{chunk, chunk_document, DocumentChunk};
pub use config::ChunkConfig;
pub use error::{ChunkerError, Result};
