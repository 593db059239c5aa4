use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorIndexError>;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Project '{0}' has no index yet")]
    NotIndexed(String),

    #[error("{0}")]
    Other(String),
}
