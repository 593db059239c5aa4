use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for document chunking behavior
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Window size in whitespace-delimited words
    pub window_words: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self { window_words: 400 }
    }
}

impl ChunkConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.window_words == 0 {
            return Err(ChunkerError::invalid_config("window_words must be > 0"));
        }
        Ok(())
    }
}
