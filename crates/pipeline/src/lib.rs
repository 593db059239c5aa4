//! # Dossier Pipeline
//!
//! The retrieval-augmented audit pipeline: question generation → targeted
//! retrieval → report synthesis → structured-summary extraction, plus
//! revision from auditor corrections and per-fingerprint result caching.
//!
//! All stages run against an explicit [`PipelineContext`] holding the vector
//! index, the model gateway, and the result cache; the caller owns an
//! [`AuditSession`] that threads one addendum's state through the stages.
//! Retrieval failures degrade into placeholder context, and a failed summary
//! leaves the session in an explicit "summary pending" state recoverable via
//! [`PipelineContext::retry_summary`]; only an exhausted report stage aborts
//! an audit.

mod cache;
mod context;
mod error;
mod fingerprint;
mod pipeline;
mod question;
mod report;
mod session;
mod summary;

pub use cache::ResultCache;
pub use context::build_context;
pub use error::{PipelineError, Result, Stage};
pub use fingerprint::Fingerprint;
pub use pipeline::PipelineContext;
pub use question::{propose_questions, DEFAULT_MAX_QUESTIONS};
pub use report::{generate_report, revise_report};
pub use session::AuditSession;
pub use summary::{extract_summary, Summary};
