//! # Dossier Store
//!
//! Filesystem source of truth for organizations, projects, reference
//! documents, and persistent project notes.
//!
//! Layout: `vault/<organization>/<project>/` holds the reference documents;
//! files whose names start with `_` are internal (notes live in
//! `_notes.txt`) and hidden from document listings. Text extraction is
//! tolerant: it never fails the caller, returning best-effort text plus a
//! warning when a document could not be fully read.

mod error;
mod extract;
mod vault;

pub use error::{Result, StoreError};
pub use extract::{extract_text, ExtractedText};
pub use vault::{ProjectId, Vault};
