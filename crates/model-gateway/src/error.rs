use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures surfaced by a concrete provider, classified so the gateway can
/// pick the right reaction per class.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Model name unknown or not enabled for this account; rotate immediately.
    #[error("Model '{0}' is unavailable")]
    ModelUnavailable(String),

    /// Quota or throttle; back off and retry the same model.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected the response schema itself (structured calls only).
    #[error("Response schema rejected: {0}")]
    SchemaRejected(String),

    /// Non-success API response that fits no other class.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Successful response without usable text.
    #[error("Empty response from model '{0}'")]
    EmptyResponse(String),
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No candidate models available")]
    NoCandidates,

    #[error("Text generation exhausted: {models} models x {attempts} attempts; last error: {last}")]
    GenerationExhausted {
        models: usize,
        attempts: usize,
        last: String,
    },

    #[error("Structured generation exhausted: {models} models tried; last error: {last}")]
    StructuredGenerationExhausted { models: usize, last: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
