use crate::error::ProviderError;
use async_trait::async_trait;

/// One generation-capable model advertised by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: Option<String>,
}

/// Sampling configuration passed through to the provider.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 1024,
            temperature: 0.2,
        }
    }
}

/// Raw access to a generative-model service.
///
/// Implementations must classify failures into the [`ProviderError`] variants
/// the gateway's rotation policy depends on: unavailable-model vs rate-limit
/// vs schema-rejection vs everything else.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Models usable for generation, unordered.
    async fn list_models(&self) -> std::result::Result<Vec<ModelInfo>, ProviderError>;

    /// Free-text generation.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> std::result::Result<String, ProviderError>;

    /// Schema-constrained generation; the returned text is expected to be a
    /// JSON document matching `schema`.
    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
        schema: &serde_json::Value,
        config: &GenerationConfig,
    ) -> std::result::Result<String, ProviderError>;
}
