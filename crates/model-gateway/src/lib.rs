//! # Dossier Model Gateway
//!
//! Resilient invoker for generative-model providers.
//!
//! The gateway hides transient provider failures from every agent: it keeps
//! an ordered list of candidate models (fixed, or discovered once per
//! gateway lifetime and sorted cheap-tier-first), rotates to the next model
//! on hard failures, and backs off exponentially on rate limits.
//!
//! Two entry points:
//! - [`ModelGateway::generate_text`] for free-text generation,
//! - [`ModelGateway::generate_structured`] for schema-constrained JSON, with
//!   an automatic fallback to unconstrained generation plus a strict-JSON
//!   instruction when a provider rejects the schema itself.

mod error;
mod gateway;
mod gemini;
mod provider;

pub use error::{GatewayError, ProviderError, Result};
pub use gateway::{GatewayConfig, ModelGateway};
pub use gemini::GeminiProvider;
pub use provider::{GenerationConfig, GenerativeProvider, ModelInfo};
